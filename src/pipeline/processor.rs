//! Per-file processing state machine.
//!
//! Drives one accepted upload through:
//! 1. Upload progress (monotonic ticks to 100)
//! 2. Classification (exactly one call, bounded by a timeout)
//! 3. Routing (authorized-ad vs. alert branch)
//! 4. Persistence (outcome record + result, committed atomically)
//!
//! Every suspension point also watches the file's cancellation token; once
//! cancelled the instance stops without touching its status or the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::classifier::adapter::{Classifier, Verdict};
use crate::config::PipelineConfig;
use crate::error::{ClassificationError, PipelineError};
use crate::intake::upload::ImageHandle;
use crate::logging::structured::LogContext;
use crate::pipeline::context::FileContext;
use crate::pipeline::events::PipelineEvent;
use crate::pipeline::state::{FileState, FileStatus};
use crate::routing::decision::{determine_routing, RoutingDecision};
use crate::storage::models::{
    new_record_id, Alert, AuthorizedAd, BoundingRegion, Detection, DetectionResult,
};
use crate::storage::store::{DetectionStore, FileOutcome, OutcomeRecord};

/// How a file task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished(FileState),
    Cancelled,
}

/// Timing and attribution knobs for a file task.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub progress_step: u8,
    pub progress_tick: Duration,
    pub classifier_timeout: Duration,
    pub authorizing_actor: String,
}

impl From<&PipelineConfig> for ProcessorSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            progress_step: config.progress_step.max(1),
            progress_tick: config.progress_tick(),
            classifier_timeout: config.classifier_timeout(),
            authorizing_actor: config.authorizing_actor.clone(),
        }
    }
}

/// Build the detection recorded for a verdict.
pub fn detection_from_verdict(verdict: &Verdict, image_uri: &str) -> Detection {
    Detection {
        id: new_record_id("det"),
        image: image_uri.to_string(),
        text: verdict.label.clone(),
        confidence: verdict.confidence(),
        status: verdict.status,
        timestamp: Utc::now(),
        bounding_boxes: verdict
            .regions
            .iter()
            .map(|r| BoundingRegion {
                id: new_record_id("bb"),
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                confidence: r.confidence_fraction.clamp(0.0, 1.0),
                text: r.label.clone(),
                status: r.status,
            })
            .collect(),
        location: verdict.location.clone(),
    }
}

/// Build the store writes for a routed verdict.
///
/// Returns the outcome plus the detection the file resolves to. On the
/// authorized branch the stored detection is the one synthesized from the
/// ad, while the file keeps the verdict's own detection (regions, location
/// and model confidence) under the same id.
pub fn build_outcome(
    verdict: &Verdict,
    decision: RoutingDecision,
    image_uri: &str,
    authorizing_actor: &str,
) -> (FileOutcome, Detection) {
    let now = Utc::now();

    let (record, stored, detection) = match decision {
        RoutingDecision::AuthorizedAd => {
            let ad = AuthorizedAd {
                id: new_record_id("ad"),
                text: verdict.label.clone(),
                added_by: authorizing_actor.to_string(),
                date_added: now,
                active: true,
                image: Some(image_uri.to_string()),
            };
            let stored = Detection::from_authorized_ad(&ad);
            let detection = Detection {
                id: ad.id.clone(),
                ..detection_from_verdict(verdict, image_uri)
            };
            (OutcomeRecord::Authorized(ad), stored, detection)
        }
        RoutingDecision::Alert {
            alert_type,
            priority,
        } => {
            let detection = detection_from_verdict(verdict, image_uri);
            let alert = Alert {
                id: new_record_id("alert"),
                detection: detection.clone(),
                alert_type,
                priority,
                timestamp: now,
            };
            (OutcomeRecord::Flagged(alert), detection.clone(), detection)
        }
    };

    let result = DetectionResult {
        id: new_record_id("res"),
        detection: stored,
        result: verdict.status.to_string(),
        timestamp: now,
    };

    (FileOutcome { record, result }, detection)
}

/// Aborts the wrapped task when dropped (timeout or cancellation).
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct FileProcessor {
    ctx: FileContext,
    log_ctx: LogContext,
    image: ImageHandle,
    status: watch::Sender<FileStatus>,
    store: Arc<DetectionStore>,
    classifier: Arc<dyn Classifier>,
    events: broadcast::Sender<PipelineEvent>,
    cancel: CancellationToken,
    settings: ProcessorSettings,
}

impl FileProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: FileContext,
        image: ImageHandle,
        status: watch::Sender<FileStatus>,
        store: Arc<DetectionStore>,
        classifier: Arc<dyn Classifier>,
        events: broadcast::Sender<PipelineEvent>,
        cancel: CancellationToken,
        settings: ProcessorSettings,
    ) -> Self {
        let log_ctx = ctx.log_context();
        Self {
            ctx,
            log_ctx,
            image,
            status,
            store,
            classifier,
            events,
            cancel,
            settings,
        }
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn state(&self) -> FileState {
        self.status.borrow().state
    }

    fn transition(&self, next: FileState) -> Result<(), PipelineError> {
        let from = self.state();
        let mut outcome = Ok(());
        self.status.send_if_modified(|s| match s.transition(next) {
            Ok(()) => true,
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome?;

        log::info!("{} FILE_STATE from={:?} to={:?}", self.log_ctx, from, next);
        self.emit(PipelineEvent::StateChanged {
            file_id: self.ctx.file_id.clone(),
            from,
            to: next,
        });
        Ok(())
    }

    fn fail(&self, error: &PipelineError) -> RunOutcome {
        let reason = error.to_string();
        let mut applied = Ok(());
        self.status.send_if_modified(|s| match s.fail(&reason) {
            Ok(()) => true,
            Err(e) => {
                applied = Err(e);
                false
            }
        });

        if let Err(e) = applied {
            log::error!("{} FILE_FAIL_REJECTED reason={} error={}", self.log_ctx, reason, e);
            return RunOutcome::Finished(self.state());
        }

        log::warn!("{} FILE_ERRORED reason={}", self.log_ctx, reason);
        self.emit(PipelineEvent::Errored {
            file_id: self.ctx.file_id.clone(),
            reason,
        });
        RunOutcome::Finished(FileState::Errored)
    }

    /// Run the file to a terminal state or until cancelled.
    pub async fn run(self) -> RunOutcome {
        log::debug!(
            "{} FILE_PROCESS_START name={} bytes={}",
            self.log_ctx,
            self.ctx.file_name,
            self.image.len()
        );

        if let Err(e) = self.transition(FileState::Uploading) {
            return self.fail(&e);
        }

        if !self.upload().await {
            return self.cancelled();
        }

        if let Err(e) = self.transition(FileState::Processing) {
            return self.fail(&e);
        }

        let verdict = tokio::select! {
            _ = self.cancel.cancelled() => return self.cancelled(),
            verdict = self.classify() => verdict,
        };
        let verdict = match verdict {
            Ok(v) => v,
            Err(e) => return self.fail(&PipelineError::from(e)),
        };

        if self.cancel.is_cancelled() {
            return self.cancelled();
        }

        self.persist(&verdict)
    }

    /// Advance progress to 100. Returns false if cancelled first.
    async fn upload(&self) -> bool {
        let mut progress: u8 = 0;
        while progress < 100 {
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.settings.progress_tick) => {}
            }

            progress = progress.saturating_add(self.settings.progress_step).min(100);
            if self.status.send_if_modified(|s| s.advance_progress(progress)) {
                self.emit(PipelineEvent::Progress {
                    file_id: self.ctx.file_id.clone(),
                    progress,
                });
            }
        }
        log::debug!("{} UPLOAD_COMPLETE", self.log_ctx);
        true
    }

    async fn classify(&self) -> Result<Verdict, ClassificationError> {
        let timeout = self.settings.classifier_timeout;
        crate::log_debug!(
            self.log_ctx,
            "CLASSIFY_START",
            classifier = self.classifier.name(),
            timeout = timeout
        );

        // A panic inside the classifier surfaces here as a join error.
        let classifier = self.classifier.clone();
        let image = self.image.clone();
        let mut call = AbortOnDrop(tokio::spawn(async move { classifier.classify(&image).await }));

        let joined = match tokio::time::timeout(timeout, &mut call.0).await {
            Ok(joined) => joined,
            Err(_) => return Err(ClassificationError::TimedOut(timeout)),
        };

        match joined {
            Ok(Ok(verdict)) => {
                log::info!(
                    "{} CLASSIFY_COMPLETE status={} confidence={} label={:?} regions={}",
                    self.log_ctx,
                    verdict.status,
                    verdict.confidence(),
                    verdict.label,
                    verdict.regions.len()
                );
                Ok(verdict)
            }
            Ok(Err(e)) => Err(e),
            Err(e) if e.is_panic() => {
                log::error!(
                    "{} CLASSIFY_PANICKED classifier={}",
                    self.log_ctx,
                    self.classifier.name()
                );
                Err(ClassificationError::Failed("classifier panicked".to_string()))
            }
            Err(_) => Err(ClassificationError::Failed(
                "classification task aborted".to_string(),
            )),
        }
    }

    fn persist(&self, verdict: &Verdict) -> RunOutcome {
        let decision = determine_routing(verdict, &self.log_ctx);
        let (outcome, detection) = build_outcome(
            verdict,
            decision,
            &self.image.uri,
            &self.settings.authorizing_actor,
        );

        if let Err(e) = self.store.commit(outcome) {
            return self.fail(&PipelineError::from(e));
        }

        let detection_id = detection.id.clone();
        let status = detection.status;
        let mut applied = Ok(());
        self.status.send_if_modified(|s| match s.complete(detection) {
            Ok(()) => true,
            Err(e) => {
                applied = Err(e);
                false
            }
        });
        if let Err(e) = applied {
            log::error!("{} FILE_COMPLETE_REJECTED error={}", self.log_ctx, e);
            return RunOutcome::Finished(self.state());
        }

        log::info!(
            "{} FILE_COMPLETE destination={} detection_id={} status={}",
            self.log_ctx,
            decision.as_str(),
            detection_id,
            status
        );
        self.emit(PipelineEvent::StateChanged {
            file_id: self.ctx.file_id.clone(),
            from: FileState::Processing,
            to: FileState::Completed,
        });
        self.emit(PipelineEvent::Completed {
            file_id: self.ctx.file_id.clone(),
            detection_id,
            status,
        });
        RunOutcome::Finished(FileState::Completed)
    }

    fn cancelled(&self) -> RunOutcome {
        log::info!("{} FILE_CANCELLED state={:?}", self.log_ctx, self.state());
        RunOutcome::Cancelled
    }
}
