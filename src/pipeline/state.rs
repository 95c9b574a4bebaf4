//! Per-file state machine states and status record.
//!
//! `Queued -> Uploading -> Processing -> {Completed | Errored}`. `Uploading`
//! may also fail straight to `Errored`. Terminal states accept no further
//! transitions, and progress never moves backwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::storage::models::Detection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileState {
    Queued,
    Uploading,
    Processing,
    Completed,
    Errored,
}

impl FileState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Completed | FileState::Errored)
    }

    pub fn can_transition_to(&self, next: FileState) -> bool {
        matches!(
            (self, next),
            (FileState::Queued, FileState::Uploading)
                | (FileState::Uploading, FileState::Processing)
                | (FileState::Uploading, FileState::Errored)
                | (FileState::Processing, FileState::Completed)
                | (FileState::Processing, FileState::Errored)
        )
    }
}

/// Observable status of one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    pub file_id: String,
    pub batch_id: String,
    pub file_name: String,
    pub preview: String,
    pub content_hash: String,
    pub state: FileState,
    /// Upload progress, 0..=100.
    pub progress: u8,
    pub detection: Option<Detection>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FileStatus {
    pub fn queued(
        file_id: &str,
        batch_id: &str,
        file_name: &str,
        preview: &str,
        content_hash: &str,
    ) -> Self {
        Self {
            file_id: file_id.to_string(),
            batch_id: batch_id.to_string(),
            file_name: file_name.to_string(),
            preview: preview.to_string(),
            content_hash: content_hash.to_string(),
            state: FileState::Queued,
            progress: 0,
            detection: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, next: FileState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Raise upload progress. Ignored outside `Uploading` or when `value`
    /// would not increase it; values above 100 are clamped.
    ///
    /// Returns whether progress changed.
    pub fn advance_progress(&mut self, value: u8) -> bool {
        let value = value.min(100);
        if self.state != FileState::Uploading || value <= self.progress {
            return false;
        }
        self.progress = value;
        self.updated_at = Utc::now();
        true
    }

    pub fn complete(&mut self, detection: Detection) -> Result<(), PipelineError> {
        self.transition(FileState::Completed)?;
        self.detection = Some(detection);
        Ok(())
    }

    pub fn fail(&mut self, reason: &str) -> Result<(), PipelineError> {
        self.transition(FileState::Errored)?;
        self.error = Some(reason.to_string());
        Ok(())
    }
}
