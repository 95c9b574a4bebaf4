//! Pipeline coordinator.
//!
//! Fans a batch of uploads out to independent file tasks, keeps a pollable
//! status cell per file, and reads through to the detection store. Must be
//! used from within a tokio runtime.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::classifier::adapter::Classifier;
use crate::config::PipelineConfig;
use crate::error::{ConfigError, IntakeError, PipelineError};
use crate::intake::preview::PreviewRegistry;
use crate::intake::upload::{compute_content_hash, ImageHandle, UploadedFile};
use crate::intake::validation::{normalize_mime, validate_upload};
use crate::logging::structured::LogContext;
use crate::pipeline::context::BatchContext;
use crate::pipeline::events::PipelineEvent;
use crate::pipeline::processor::{FileProcessor, ProcessorSettings, RunOutcome};
use crate::pipeline::state::{FileState, FileStatus};
use crate::storage::models::{Alert, DashboardStats, Detection};
use crate::storage::store::DetectionStore;

/// An upload turned away at intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub file_name: String,
    pub error: IntakeError,
}

/// Result of submitting a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSubmission {
    pub batch_id: String,
    /// File ids of accepted uploads, in submission order.
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedFile>,
}

struct FileSlot {
    file_id: String,
    preview: String,
    status: watch::Receiver<FileStatus>,
    cancel: CancellationToken,
    task: Option<JoinHandle<RunOutcome>>,
}

pub struct PipelineCoordinator {
    config: PipelineConfig,
    settings: ProcessorSettings,
    store: Arc<DetectionStore>,
    classifier: Arc<dyn Classifier>,
    previews: Arc<PreviewRegistry>,
    files: Mutex<Vec<FileSlot>>,
    events: broadcast::Sender<PipelineEvent>,
}

impl PipelineCoordinator {
    /// Validate `config` and apply its capacity cap and trend window to
    /// `store`.
    pub fn new(
        config: PipelineConfig,
        store: Arc<DetectionStore>,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        store.apply_config(&config);
        let (events, _) = broadcast::channel(config.event_buffer);
        Ok(Self {
            settings: ProcessorSettings::from(&config),
            config,
            store,
            classifier,
            previews: Arc::new(PreviewRegistry::new()),
            files: Mutex::new(Vec::new()),
            events,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<DetectionStore> {
        &self.store
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Subscribe to progress and state events for files submitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Validate and start every file in `files`.
    ///
    /// Rejected files never enter the state machine; accepted ones run
    /// independently with no ordering between them.
    pub fn submit_batch(&self, files: Vec<UploadedFile>) -> BatchSubmission {
        let batch = BatchContext::new();
        let log_ctx = batch.log_context();
        log::info!("{} BATCH_RECEIVED files={}", log_ctx, files.len());

        let mut submission = BatchSubmission {
            batch_id: batch.batch_id.clone(),
            ..BatchSubmission::default()
        };

        for file in files {
            match validate_upload(&file, &self.config, &log_ctx) {
                Ok(()) => submission.accepted.push(self.start(&batch, file)),
                Err(error) => submission.rejected.push(RejectedFile {
                    file_name: file.file_name,
                    error,
                }),
            }
        }

        log::info!(
            "{} BATCH_SUBMITTED accepted={} rejected={}",
            log_ctx,
            submission.accepted.len(),
            submission.rejected.len()
        );
        submission
    }

    /// Submit a single file. Returns its file id.
    pub fn submit(&self, file: UploadedFile) -> Result<String, IntakeError> {
        let mut submission = self.submit_batch(vec![file]);
        match submission.rejected.pop() {
            Some(rejected) => Err(rejected.error),
            None => submission
                .accepted
                .pop()
                .ok_or(IntakeError::Empty),
        }
    }

    fn start(&self, batch: &BatchContext, file: UploadedFile) -> String {
        let ctx = batch.file_context(&file.file_name);
        let file_id = ctx.file_id.clone();

        let image = ImageHandle {
            uri: self.previews.create(),
            content_hash: compute_content_hash(&file.bytes),
            mime_type: normalize_mime(&file.mime_type),
            file_name: file.file_name,
            bytes: Arc::from(file.bytes),
        };

        let (status_tx, status_rx) = watch::channel(FileStatus::queued(
            &ctx.file_id,
            &ctx.batch_id,
            &ctx.file_name,
            &image.uri,
            &image.content_hash,
        ));
        let cancel = CancellationToken::new();
        let preview = image.uri.clone();

        let _ = self.events.send(PipelineEvent::Queued {
            file_id: file_id.clone(),
            file_name: ctx.file_name.clone(),
        });
        log::info!(
            "{} FILE_QUEUED name={} hash={}",
            ctx.log_context(),
            ctx.file_name,
            image.content_hash
        );

        let processor = FileProcessor::new(
            ctx,
            image,
            status_tx,
            self.store.clone(),
            self.classifier.clone(),
            self.events.clone(),
            cancel.clone(),
            self.settings.clone(),
        );

        // Register the slot before the task can make progress.
        let mut files = self.files.lock();
        let task = tokio::spawn(processor.run());
        files.push(FileSlot {
            file_id: file_id.clone(),
            preview,
            status: status_rx,
            cancel,
            task: Some(task),
        });

        file_id
    }

    /// Current status of every live file, in submission order.
    pub fn snapshot(&self) -> Vec<FileStatus> {
        self.files
            .lock()
            .iter()
            .map(|slot| slot.status.borrow().clone())
            .collect()
    }

    pub fn status(&self, file_id: &str) -> Option<FileStatus> {
        self.files
            .lock()
            .iter()
            .find(|slot| slot.file_id == file_id)
            .map(|slot| slot.status.borrow().clone())
    }

    /// Remove a file from the view.
    ///
    /// A file still in flight is cancelled and stops updating. Its preview
    /// handle is released either way; records already committed for a
    /// completed file stay in the store.
    pub fn remove_file(&self, file_id: &str) -> Result<FileStatus, PipelineError> {
        let slot = {
            let mut files = self.files.lock();
            let index = files
                .iter()
                .position(|slot| slot.file_id == file_id)
                .ok_or_else(|| PipelineError::UnknownFile(file_id.to_string()))?;
            files.remove(index)
        };

        slot.cancel.cancel();
        self.previews.revoke(&slot.preview);
        let last = slot.status.borrow().clone();

        let log_ctx = LogContext::for_file(&last.batch_id, file_id);
        log::info!("{} FILE_REMOVED state={:?}", log_ctx, last.state);
        let _ = self.events.send(PipelineEvent::Removed {
            file_id: file_id.to_string(),
        });
        Ok(last)
    }

    /// Wait until a file reaches a terminal state.
    ///
    /// Returns `None` if the file is unknown or was removed before finishing.
    pub async fn wait_for(&self, file_id: &str) -> Option<FileState> {
        let mut status = {
            let files = self.files.lock();
            files
                .iter()
                .find(|slot| slot.file_id == file_id)?
                .status
                .clone()
        };

        let state = status
            .wait_for(|s| s.state.is_terminal())
            .await
            .ok()
            .map(|s| s.state);
        state
    }

    /// Wait for every file task started so far to finish or be cancelled.
    pub async fn wait_all(&self) {
        let tasks: Vec<JoinHandle<RunOutcome>> = {
            let mut files = self.files.lock();
            files.iter_mut().filter_map(|slot| slot.task.take()).collect()
        };

        for task in tasks {
            if let Err(e) = task.await {
                log::error!("FILE_TASK_JOIN_FAILED error={}", e);
            }
        }
    }

    pub fn list_detections(&self) -> Vec<Detection> {
        self.store.list_detections()
    }

    pub fn list_alerts(&self) -> Vec<Alert> {
        self.store.list_alerts()
    }

    pub fn compute_stats(&self) -> DashboardStats {
        self.store.compute_stats()
    }
}

impl Drop for PipelineCoordinator {
    fn drop(&mut self) {
        for slot in self.files.get_mut().iter() {
            slot.cancel.cancel();
        }
    }
}
