//! Tokens consumed from the external scanner/parser front end
//!
//! The backend never scans source text itself; it receives one token per
//! semantic action, already classified by the table-driven DFA.

use crate::sema::types::BaseType;
use crate::utils::Span;
use serde::{Deserialize, Serialize};

/// Token classification as produced by the external scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    // Type keywords
    KwInt,
    KwFloat,
    KwChar,
    KwString,
    KwBool,
    KwDouble,
    KwLong,
    KwVoid,

    Ident,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,

    // Operators the analyzer reacts to
    Assign,
    Greater,
    Less,
    GreaterEq,
    LessEq,
    EqEq,
    NotEq,

    // Literals
    IntLit,
    HexLit,
    BinLit,
    FloatLit,
    CharLit,
    StrLit,
    KwTrue,
    KwFalse,
}

impl TokenKind {
    /// Declaration type introduced by a type keyword, if any
    pub fn type_keyword(&self) -> Option<BaseType> {
        match self {
            TokenKind::KwInt => Some(BaseType::Int),
            TokenKind::KwFloat => Some(BaseType::Float),
            TokenKind::KwChar => Some(BaseType::Char),
            TokenKind::KwString => Some(BaseType::String),
            TokenKind::KwBool => Some(BaseType::Bool),
            TokenKind::KwDouble => Some(BaseType::Double),
            TokenKind::KwLong => Some(BaseType::Long),
            TokenKind::KwVoid => Some(BaseType::Void),
            _ => None,
        }
    }

    /// Type a literal token contributes to argument-type inference
    pub fn literal_type(&self) -> Option<BaseType> {
        match self {
            TokenKind::IntLit | TokenKind::HexLit | TokenKind::BinLit => Some(BaseType::Int),
            TokenKind::FloatLit => Some(BaseType::Float),
            TokenKind::CharLit => Some(BaseType::Char),
            TokenKind::StrLit => Some(BaseType::String),
            TokenKind::KwTrue | TokenKind::KwFalse => Some(BaseType::Bool),
            _ => None,
        }
    }
}

/// One token: kind, raw lexeme and source position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn position(&self) -> usize {
        self.span.position()
    }
}
