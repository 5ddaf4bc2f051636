//! Base type set and the two compatibility rules
//!
//! Expression typing uses numeric promotion; call boundaries use a strict
//! nominal match. The asymmetry is deliberate language strictness: no
//! implicit numeric coercion is accepted when binding arguments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed base-type set of the teaching language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Int,
    Float,
    Char,
    Bool,
    String,
    Double,
    Long,
    Void,
    Unknown,
}

impl BaseType {
    /// Resolve a type keyword lexeme; anything unrecognized is Unknown
    pub fn from_keyword(s: &str) -> BaseType {
        match s.to_ascii_lowercase().as_str() {
            "int" => BaseType::Int,
            "float" => BaseType::Float,
            "char" => BaseType::Char,
            "bool" => BaseType::Bool,
            "string" => BaseType::String,
            "double" => BaseType::Double,
            "long" => BaseType::Long,
            "void" => BaseType::Void,
            _ => BaseType::Unknown,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            BaseType::Int | BaseType::Long | BaseType::Float | BaseType::Double
        )
    }

    /// Rank used for numeric promotion: int < long < float < double
    fn numeric_rank(&self) -> u8 {
        match self {
            BaseType::Int => 1,
            BaseType::Long => 2,
            BaseType::Float => 3,
            BaseType::Double => 4,
            _ => 0,
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BaseType::Int => "int",
            BaseType::Float => "float",
            BaseType::Char => "char",
            BaseType::Bool => "bool",
            BaseType::String => "string",
            BaseType::Double => "double",
            BaseType::Long => "long",
            BaseType::Void => "void",
            BaseType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Expression-typing promotion: unknown yields the other side, equal types
/// are preserved, two different numerics yield the higher rank, and any other
/// mix collapses to Unknown rather than erroring.
pub fn promote(a: BaseType, b: BaseType) -> BaseType {
    if a == BaseType::Unknown {
        return b;
    }
    if b == BaseType::Unknown {
        return a;
    }
    if a == b {
        return a;
    }
    if a.is_numeric() && b.is_numeric() {
        if a.numeric_rank() >= b.numeric_rank() {
            a
        } else {
            b
        }
    } else {
        BaseType::Unknown
    }
}

/// Strict nominal compatibility used at call boundaries: exact equality only.
/// A received Unknown never blocks compilation (inference failure is not an
/// error), which makes this check one-sided on purpose.
pub fn call_compatible(expected: BaseType, received: BaseType) -> bool {
    received == BaseType::Unknown || expected == received
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_resolution() {
        assert_eq!(BaseType::from_keyword("INT"), BaseType::Int);
        assert_eq!(BaseType::from_keyword("double"), BaseType::Double);
        assert_eq!(BaseType::from_keyword("str"), BaseType::Unknown);
    }

    #[test]
    fn promotion_prefers_higher_numeric_rank() {
        assert_eq!(promote(BaseType::Int, BaseType::Long), BaseType::Long);
        assert_eq!(promote(BaseType::Double, BaseType::Float), BaseType::Double);
        assert_eq!(promote(BaseType::Int, BaseType::Float), BaseType::Float);
    }

    #[test]
    fn promotion_with_unknown_yields_other_side() {
        assert_eq!(promote(BaseType::Unknown, BaseType::Char), BaseType::Char);
        assert_eq!(promote(BaseType::Bool, BaseType::Unknown), BaseType::Bool);
    }

    #[test]
    fn mixed_non_numeric_collapses_to_unknown() {
        assert_eq!(promote(BaseType::Bool, BaseType::Char), BaseType::Unknown);
        assert_eq!(promote(BaseType::Int, BaseType::String), BaseType::Unknown);
    }

    #[test]
    fn call_compatibility_is_strict_nominal() {
        assert!(call_compatible(BaseType::Int, BaseType::Int));
        // Promotion would accept int -> long; the call boundary does not.
        assert!(!call_compatible(BaseType::Long, BaseType::Int));
        assert!(!call_compatible(BaseType::Int, BaseType::Float));
        assert!(call_compatible(BaseType::Int, BaseType::Unknown));
    }
}
