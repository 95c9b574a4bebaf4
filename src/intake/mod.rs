//! Intake boundary.
//!
//! Validates raw uploads and turns accepted ones into image handles with a
//! revocable preview URI and a content hash.

pub mod preview;
pub mod upload;
pub mod validation;

pub use preview::*;
pub use upload::*;
pub use validation::*;
