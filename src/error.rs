//! Error types for the ingestion pipeline.
//!
//! Every failure is scoped to a single file. Intake errors surface
//! synchronously to the submitter; classification and persistence errors
//! move the file's state machine to `Errored` with the error's display
//! string as the human-readable reason.

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::state::FileState;

/// Rejection raised before a file enters the state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("unsupported file type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("file too large: {byte_size} bytes exceeds limit of {limit} bytes")]
    TooLarge { byte_size: u64, limit: u64 },

    #[error("file is empty")]
    Empty,

    #[error("declared size {declared} does not match payload size {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("declared type {declared} does not match content type {detected}")]
    ContentMismatch { declared: String, detected: String },

    #[error("invalid file name: {0}")]
    InvalidFileName(String),
}

/// Classifier failure, including the coordinator-imposed timeout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("classification failed: {0}")]
    Failed(String),

    #[error("classification timed out after {0:?}")]
    TimedOut(Duration),
}

/// Store-side failure while committing a file's outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("detection store is closed")]
    Closed,

    #[error("detection store capacity of {limit} records exceeded")]
    CapacityExceeded { limit: usize },

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Invalid configuration value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Top-level pipeline error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("intake rejected: {0}")]
    IntakeRejected(#[from] IntakeError),

    #[error("{0}")]
    ClassificationFailed(#[from] ClassificationError),

    #[error("persistence failed: {0}")]
    PersistenceFailed(#[from] StoreError),

    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: FileState, to: FileState },

    #[error("unknown file: {0}")]
    UnknownFile(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
