//! Storage module.
//!
//! The in-memory detection store, its record models, dashboard statistics
//! and alert review filters.

pub mod models;
pub mod query;
pub mod sample;
pub mod stats;
pub mod store;

pub use models::*;
pub use query::*;
pub use sample::*;
pub use stats::*;
pub use store::*;
