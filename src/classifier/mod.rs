//! Classifier adapter module.
//!
//! - `adapter` - the `Classifier` trait and verdict types
//! - `simulated` - randomized stand-in model
//! - `fixed` - preset verdicts

pub mod adapter;
pub mod fixed;
pub mod simulated;

pub use adapter::*;
pub use fixed::*;
pub use simulated::*;
