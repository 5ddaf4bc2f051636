//! Source location tracking
//!
//! The external scanner reports one byte offset per token; spans keep the
//! range so diagnostics can point at the whole lexeme.

use serde::{Deserialize, Serialize};

/// A span represents a range in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A span covering a single offset (what the scanner reports per token)
    pub fn at(offset: usize) -> Self {
        Self { start: offset, end: offset }
    }

    /// Create a dummy span (for testing)
    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Merge two spans
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The position reported in diagnostics
    pub fn position(&self) -> usize {
        self.start
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}
