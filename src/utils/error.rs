//! Error and warning types for the compiler backend
//!
//! Semantic errors abort the compilation immediately; the caller must not
//! resume after receiving one. Checks that have to keep analyzing (duplicate
//! function, undeclared call target, arity/type mismatch) are recorded on the
//! analyzer instead and only raise the non-throwing fatal flag.

use crate::sema::types::BaseType;
use crate::utils::Span;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Error {
    // ==================== Front-end Errors (propagated unchanged) ====================
    #[error("lexical error: {message}")]
    Lexical { message: String, span: Span },

    #[error("syntactic error: {message}")]
    Syntactic { message: String, span: Span },

    // ==================== Semantic Errors ====================
    #[error("symbol '{name}' already exists in this scope")]
    DuplicateSymbol { name: String, span: Span },

    #[error("symbol '{name}' was already declared in function '{function}'")]
    Shadowing {
        name: String,
        function: String,
        span: Span,
    },

    #[error("'{name}' was not declared in this scope")]
    UndeclaredSymbol { name: String, span: Span },

    #[error("declaration of '{name}' without a current type")]
    MissingTypeContext { name: String, span: Span },

    #[error("function '{name}' was already declared")]
    DuplicateFunction { name: String, span: Span },

    #[error("call to '{name}', which was not declared as a function")]
    UndeclaredFunctionCall { name: String, span: Span },

    #[error("call to '{name}' with the wrong number of arguments: expected {expected}, received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
        span: Span,
    },

    #[error("incompatible type for parameter {index} of '{name}': expected '{expected}', received '{received}'")]
    TypeMismatch {
        name: String,
        /// 1-based parameter index
        index: usize,
        expected: BaseType,
        received: BaseType,
        span: Span,
    },
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Span {
        match self {
            Self::Lexical { span, .. } => *span,
            Self::Syntactic { span, .. } => *span,
            Self::DuplicateSymbol { span, .. } => *span,
            Self::Shadowing { span, .. } => *span,
            Self::UndeclaredSymbol { span, .. } => *span,
            Self::MissingTypeContext { span, .. } => *span,
            Self::DuplicateFunction { span, .. } => *span,
            Self::UndeclaredFunctionCall { span, .. } => *span,
            Self::ArityMismatch { span, .. } => *span,
            Self::TypeMismatch { span, .. } => *span,
        }
    }
}

/// Non-fatal diagnostics: accumulated and reported alongside a successful
/// compilation, never aborting it.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Warning {
    #[error("symbol '{name}' (type: {ty}, scope: {scope}) used without initialization at position {position}")]
    UseBeforeInit {
        name: String,
        ty: BaseType,
        scope: String,
        position: usize,
    },

    #[error("symbol '{name}' (type: {ty}, scope: {scope}) declared but never used")]
    UnusedSymbol {
        name: String,
        ty: BaseType,
        scope: String,
    },

    #[error("argument {index} of call to '{name}' has no inferred type")]
    UnresolvedArgumentType { name: String, index: usize },
}
