//! Utility module

mod error;
mod span;

pub use error::{Error, Result, Warning};
pub use span::Span;
