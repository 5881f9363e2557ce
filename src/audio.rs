//! Audio output abstraction and its `rodio` implementation.
//!
//! The coordinator owns exactly one [`AudioOutput`]; nothing else touches it.

mod output;
mod silent;
mod sink;

pub use output::{AudioOutput, RodioOutput};
pub use silent::SilentOutput;
