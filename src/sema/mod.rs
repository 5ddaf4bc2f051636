//! Semantic analysis: tokens, types, symbols and the action-driven analyzer

pub mod analyzer;
pub mod symbols;
pub mod token;
pub mod types;

pub use analyzer::{Analyzer, SemanticAction};
pub use symbols::{Symbol, SymbolKind};
pub use token::{Token, TokenKind};
pub use types::BaseType;
