//! Code generation: BIP instruction emission and tree lowering

pub mod emitter;
pub mod lower;

pub use emitter::EmitterOptions;
pub use lower::{lower_program, param_cell};
