//! Batch and file context for pipeline log lines.
//!
//! Every line the pipeline writes starts with the upload batch and, once a
//! file has been accepted, the file id:
//!
//! ```text
//! [batch=batch-1a2b3c4d] [file=file-9f..] FILE_STATE from=Uploading to=Processing
//! ```
//!
//! so one file's journey can be grepped out of a busy batch.

use std::fmt;

/// Correlation ids for an upload batch, optionally narrowed to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    pub batch_id: String,
    pub file_id: Option<String>,
}

impl LogContext {
    /// Context for batch-level events (receipt, intake, submission summary).
    pub fn new(batch_id: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            file_id: None,
        }
    }

    /// Context for one file's events, even after it left the coordinator.
    pub fn for_file(batch_id: &str, file_id: &str) -> Self {
        Self::new(batch_id).with_file(file_id)
    }

    /// Narrow a batch context to one of its files.
    pub fn with_file(&self, file_id: &str) -> Self {
        Self {
            batch_id: self.batch_id.clone(),
            file_id: Some(file_id.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[batch={}]", self.batch_id)?;
        if let Some(file_id) = &self.file_id {
            write!(f, " [file={}]", file_id)?;
        }
        Ok(())
    }
}

/// Log `EVENT key=value ...` at `$level` behind a [`LogContext`] prefix.
///
/// Values are rendered with `Debug`, so strings come out quoted.
#[macro_export]
macro_rules! log_with_context {
    ($level:expr, $ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::log!(
            $level,
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        )
    };
}

/// Pipeline milestone (routing decided, file completed).
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::log_with_context!(log::Level::Info, $($arg)+)
    };
}

/// File turned away or failed.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)+) => {
        $crate::log_with_context!(log::Level::Warn, $($arg)+)
    };
}

/// Per-step detail (classifier call start, progress).
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => {
        $crate::log_with_context!(log::Level::Debug, $($arg)+)
    };
}
