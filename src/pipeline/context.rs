//! Pipeline context management.
//!
//! Provides batch and file context for logging and state tracking.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::structured::LogContext;

/// Context for a batch of uploaded files.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub batch_id: String,
    pub submitted_at: DateTime<Utc>,
}

impl Default for BatchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchContext {
    pub fn new() -> Self {
        Self {
            batch_id: format!("batch-{}", &Uuid::new_v4().to_string()[..8]),
            submitted_at: Utc::now(),
        }
    }

    /// Allocate a file context within this batch.
    pub fn file_context(&self, file_name: &str) -> FileContext {
        FileContext {
            batch_id: self.batch_id.clone(),
            file_id: format!("file-{}", Uuid::new_v4().simple()),
            file_name: file_name.to_string(),
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.batch_id)
    }
}

/// Context for a single file within a batch.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub batch_id: String,
    pub file_id: String,
    pub file_name: String,
}

impl FileContext {
    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.batch_id).with_file(&self.file_id)
    }
}
