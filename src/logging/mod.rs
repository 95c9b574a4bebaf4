//! Structured logging with batch and file context.
//!
//! Provides logging macros and utilities that include batch_id and file_id
//! in every log message for easy correlation.

pub mod structured;

pub use structured::*;
