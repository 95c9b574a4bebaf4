//! Events broadcast to pipeline observers.

use serde::Serialize;

use crate::pipeline::state::FileState;
use crate::storage::models::DetectionStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Queued {
        file_id: String,
        file_name: String,
    },
    Progress {
        file_id: String,
        progress: u8,
    },
    StateChanged {
        file_id: String,
        from: FileState,
        to: FileState,
    },
    Completed {
        file_id: String,
        detection_id: String,
        status: DetectionStatus,
    },
    Errored {
        file_id: String,
        reason: String,
    },
    Removed {
        file_id: String,
    },
}

impl PipelineEvent {
    pub fn file_id(&self) -> &str {
        match self {
            PipelineEvent::Queued { file_id, .. }
            | PipelineEvent::Progress { file_id, .. }
            | PipelineEvent::StateChanged { file_id, .. }
            | PipelineEvent::Completed { file_id, .. }
            | PipelineEvent::Errored { file_id, .. }
            | PipelineEvent::Removed { file_id } => file_id,
        }
    }
}
