//! DeepSight Core - detection ingestion pipeline and detection store
//!
//! This crate takes batches of uploaded advertisement images, classifies
//! each one, routes the verdict, and records the outcome in an in-memory
//! store that feeds dashboard statistics. The implementation prioritizes:
//!
//! 1. **Isolation** - Every file runs its own state machine; one failure never
//!    affects its siblings
//! 2. **Consistency** - A file's records land in the store all at once or not
//!    at all
//! 3. **Logging** - Every decision point logged with batch and file context
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `intake` - Upload validation, preview handles, content hashing
//! - `classifier` - Pluggable classifier adapter (simulated and fixed)
//! - `routing` - Authorized-ad vs. alert routing decisions
//! - `pipeline` - Per-file state machine and batch coordinator
//! - `storage` - Detection store, models, stats and alert filters
//! - `config` - Pipeline configuration (JSON and environment)
//! - `logging` - Structured logging with batch/file context

pub mod classifier;
pub mod config;
pub mod error;
pub mod intake;
pub mod logging;
pub mod pipeline;
pub mod routing;
pub mod storage;

pub use classifier::{Classifier, FixedClassifier, SimulatedClassifier, Verdict};
pub use config::PipelineConfig;
pub use error::{
    ClassificationError, ConfigError, IntakeError, PipelineError, Result, StoreError,
};
pub use intake::UploadedFile;
pub use pipeline::{BatchSubmission, FileState, FileStatus, PipelineCoordinator, PipelineEvent};
pub use storage::{
    Alert, AlertPriority, AlertType, AuthorizedAd, DashboardStats, Detection, DetectionStatus,
    DetectionStore,
};

/// Initialize the process-wide logger.
///
/// Honors `RUST_LOG`; defaults to `info`. Safe to call more than once.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
