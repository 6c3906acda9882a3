//! Synthetic data helpers.
//!
//! Camera rigs placed around a subject and simple animated poses, used by
//! tests, demos, and the `generate` command when no camera table is given.

pub mod placement;
pub mod pose;

pub use placement::*;
pub use pose::*;
