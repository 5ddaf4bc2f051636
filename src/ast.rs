//! Statement and expression tree consumed by the lowering driver
//!
//! The parser front end hands the backend this structured program alongside
//! the semantic-action stream; lowering walks the tree directly and never
//! re-scans source text. Expressions arrive already flattened into a
//! left-to-right chain of binary operations, which is exactly the shape an
//! accumulator machine folds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Declaration with optional static initializer; contributes storage and
    /// initial values to the data section, never instructions.
    Decl {
        name: String,
        #[serde(default)]
        array_len: Option<usize>,
        #[serde(default)]
        init: Vec<i64>,
    },
    Function {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Assign {
        target: Target,
        value: Rvalue,
    },
    If {
        cond: Cond,
        then_body: Vec<Stmt>,
        #[serde(default)]
        else_body: Vec<Stmt>,
    },
    While {
        cond: Cond,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Cond,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Cond>,
        step: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Call(Call),
    Return(Option<Operand>),
    /// `cin >> target`
    Read(Target),
    /// `cout << operand`
    Write(Operand),
}

/// Assignment destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Var(String),
    Elem { array: String, index: Index },
}

/// Array subscript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Index {
    Lit(i64),
    Var(String),
    /// Computed subscript; evaluated into the accumulator first
    Expr(Box<Expr>),
}

/// Atomic value position inside an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Lit(i64),
    Var(String),
    Elem { array: String, index: Index },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Operand>,
}

/// Right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rvalue {
    Expr(Expr),
    Call(Call),
}

/// Left-to-right chain: `first op1 o1 op2 o2 ...`, no precedence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub first: Operand,
    #[serde(default)]
    pub rest: Vec<(BinOp, Operand)>,
}

impl Expr {
    pub fn single(operand: Operand) -> Self {
        Self {
            first: operand,
            rest: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
}

impl BinOp {
    /// Operand order may be swapped for these without changing the result
    pub fn is_commutative(&self) -> bool {
        !matches!(self, BinOp::Sub | BinOp::Div)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

/// Branch condition: a relational comparison, or a bare value tested for
/// truthiness (non-zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cond {
    Rel {
        lhs: Operand,
        op: RelOp,
        rhs: Operand,
    },
    Value(Expr),
}
