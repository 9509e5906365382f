//! Pure relay domain state with no I/O dependencies.

pub mod held;

pub use held::{HeldInputSet, InputId};
