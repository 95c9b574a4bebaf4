//! End-to-end pipeline behaviour against the public API.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deepsight_core::intake::ImageHandle;
use deepsight_core::storage::Confidence;
use deepsight_core::{
    AlertPriority, AlertType, ClassificationError, Classifier, DetectionStatus, DetectionStore,
    FileState, FixedClassifier, PipelineConfig, PipelineCoordinator, PipelineEvent,
    SimulatedClassifier, UploadedFile, Verdict,
};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I'];
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0];

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        progress_step: 25,
        progress_tick_ms: 1,
        classifier_timeout_ms: 2_000,
        simulated_delay_min_ms: 1,
        simulated_delay_max_ms: 5,
        ..PipelineConfig::default()
    }
}

fn png(name: &str) -> UploadedFile {
    UploadedFile::new(name, "image/png", PNG.to_vec())
}

fn coordinator_with(
    config: PipelineConfig,
    classifier: Arc<dyn Classifier>,
) -> (PipelineCoordinator, Arc<DetectionStore>) {
    let store = Arc::new(DetectionStore::new());
    let coordinator = PipelineCoordinator::new(config, store.clone(), classifier).unwrap();
    (coordinator, store)
}

/// Answers by file name so one batch can mix outcomes.
struct ByName;

#[async_trait]
impl Classifier for ByName {
    fn name(&self) -> &str {
        "by-name"
    }

    async fn classify(&self, image: &ImageHandle) -> Result<Verdict, ClassificationError> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        if image.file_name.starts_with("fail") {
            return Err(ClassificationError::Failed("model unavailable".to_string()));
        }
        if image.file_name.starts_with("ok") {
            return Ok(Verdict::new(DetectionStatus::Authorized, 97, "Licensed Billboard"));
        }
        Ok(Verdict::new(DetectionStatus::Unauthorized, 81, "Unlicensed Poster"))
    }
}

#[tokio::test]
async fn test_unauthorized_verdict_raises_alert() {
    let classifier = FixedClassifier::verdict(Verdict::new(DetectionStatus::Unauthorized, 92, "X"));
    let (coordinator, store) = coordinator_with(fast_config(), Arc::new(classifier));

    let file_id = coordinator.submit(png("street.png")).unwrap();
    assert_eq!(coordinator.wait_for(&file_id).await, Some(FileState::Completed));

    let alerts = store.list_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::Violation);
    assert_eq!(alerts[0].priority, AlertPriority::High);

    let detections = store.list_detections();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].status, DetectionStatus::Unauthorized);
    assert_eq!(detections[0].confidence.to_string(), "92%");
    assert_eq!(alerts[0].detection.id, detections[0].id);

    let results = store.list_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].result, DetectionStatus::Unauthorized.to_string());
    assert!(store.list_authorized_ads().is_empty());

    let status = coordinator.status(&file_id).unwrap();
    assert_eq!(status.progress, 100);
    assert_eq!(status.detection.map(|d| d.id), Some(detections[0].id.clone()));
}

#[tokio::test]
async fn test_authorized_verdict_registers_ad() {
    let classifier = FixedClassifier::verdict(Verdict::new(DetectionStatus::Authorized, 71, "Y"));
    let (coordinator, store) = coordinator_with(fast_config(), Arc::new(classifier));

    let file_id = coordinator.submit(png("ok.png")).unwrap();
    assert_eq!(coordinator.wait_for(&file_id).await, Some(FileState::Completed));

    assert_eq!(store.list_authorized_ads().len(), 1);
    assert!(store.list_alerts().is_empty());

    let detections = store.list_detections();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].status, DetectionStatus::Authorized);
    assert_eq!(detections[0].confidence, Confidence::FULL);
    assert_eq!(detections[0].confidence.to_string(), "100%");
}

#[tokio::test]
async fn test_classifier_timeout_errors_without_records() {
    let classifier = FixedClassifier::verdict(Verdict::new(DetectionStatus::Unauthorized, 92, "X"))
        .with_delay(Duration::from_secs(30));
    let config = PipelineConfig {
        classifier_timeout_ms: 30,
        ..fast_config()
    };
    let (coordinator, store) = coordinator_with(config, Arc::new(classifier));

    let file_id = coordinator.submit(png("slow.png")).unwrap();
    assert_eq!(coordinator.wait_for(&file_id).await, Some(FileState::Errored));

    let status = coordinator.status(&file_id).unwrap();
    assert!(status.error.unwrap().contains("timed out"));
    assert!(store.list_detections().is_empty());
    assert!(store.list_results().is_empty());
}

#[tokio::test]
async fn test_mixed_batch_files_are_isolated() {
    let (coordinator, store) = coordinator_with(fast_config(), Arc::new(ByName));

    let submission = coordinator.submit_batch(vec![
        png("ok-1.png"),
        png("fail-1.png"),
        UploadedFile::new("bad-2.jpg", "image/jpeg", JPEG.to_vec()),
        UploadedFile::new("notes.txt", "text/plain", b"not an image".to_vec()),
        png("ok-2.png"),
    ]);
    assert_eq!(submission.accepted.len(), 4);
    assert_eq!(submission.rejected.len(), 1);

    coordinator.wait_all().await;

    let states: Vec<FileState> = coordinator.snapshot().iter().map(|s| s.state).collect();
    assert_eq!(
        states,
        vec![
            FileState::Completed,
            FileState::Errored,
            FileState::Completed,
            FileState::Completed,
        ]
    );

    assert_eq!(store.list_authorized_ads().len(), 2);
    assert_eq!(store.list_alerts().len(), 1);
    assert_eq!(store.list_alerts()[0].priority, AlertPriority::Medium);
    assert_eq!(store.list_results().len(), 3);
    assert_eq!(store.list_detections().len(), 3);

    let stats = coordinator.compute_stats();
    assert_eq!(stats.total_detections, 3);
    assert_eq!(stats.unauthorized_ads, 1);
}

#[tokio::test]
async fn test_store_references_stay_consistent() {
    let classifier = SimulatedClassifier::from_config(&fast_config()).with_seed(7);
    let (coordinator, store) = coordinator_with(fast_config(), Arc::new(classifier));

    let files = (0..12).map(|i| png(&format!("ad-{}.png", i))).collect();
    let submission = coordinator.submit_batch(files);
    assert_eq!(submission.accepted.len(), 12);
    coordinator.wait_all().await;

    let detections = store.list_detections();
    let ids: HashSet<&str> = detections.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids.len(), detections.len());
    assert_eq!(detections.len(), 12);

    for alert in store.list_alerts() {
        assert!(ids.contains(alert.detection.id.as_str()));
    }
    for result in store.list_results() {
        assert!(ids.contains(result.detection.id.as_str()));
    }
    assert_eq!(
        store.list_alerts().len() + store.list_authorized_ads().len(),
        12
    );
}

#[tokio::test]
async fn test_removing_file_cancels_and_releases_preview() {
    let classifier = FixedClassifier::verdict(Verdict::new(DetectionStatus::Unauthorized, 92, "X"))
        .with_delay(Duration::from_secs(30));
    let (coordinator, store) = coordinator_with(fast_config(), Arc::new(classifier));
    let mut events = coordinator.subscribe();

    let file_id = coordinator.submit(png("a.png")).unwrap();
    let preview = coordinator.status(&file_id).unwrap().preview;
    assert!(coordinator.previews().is_active(&preview));

    // Let it reach the classifier.
    loop {
        match events.recv().await.unwrap() {
            PipelineEvent::StateChanged { to, .. } if to == FileState::Processing => break,
            _ => continue,
        }
    }

    let removed = coordinator.remove_file(&file_id).unwrap();
    assert_eq!(removed.state, FileState::Processing);
    assert!(!coordinator.previews().is_active(&preview));
    assert!(coordinator.snapshot().is_empty());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(store.list_detections().is_empty());
}

#[tokio::test]
async fn test_closed_store_fails_files() {
    let classifier = FixedClassifier::verdict(Verdict::new(DetectionStatus::Unauthorized, 92, "X"));
    let (coordinator, store) = coordinator_with(fast_config(), Arc::new(classifier));
    store.close();

    let file_id = coordinator.submit(png("a.png")).unwrap();
    assert_eq!(coordinator.wait_for(&file_id).await, Some(FileState::Errored));
    assert!(store.list_detections().is_empty());
}

#[tokio::test]
async fn test_journal_lists_committed_records() {
    let classifier = FixedClassifier::verdict(Verdict::new(DetectionStatus::Unauthorized, 85, "X"));
    let (coordinator, store) = coordinator_with(fast_config(), Arc::new(classifier));

    let file_id = coordinator.submit(png("a.png")).unwrap();
    coordinator.wait_for(&file_id).await;

    let mut buf = Vec::new();
    let written = store.write_journal(&mut buf).unwrap();
    assert_eq!(written, 3);

    let kinds: Vec<String> = String::from_utf8(buf)
        .unwrap()
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["kind"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(kinds, vec!["detection", "alert", "result"]);
}

struct Crashing;

#[async_trait]
impl Classifier for Crashing {
    fn name(&self) -> &str {
        "crashing"
    }

    async fn classify(&self, image: &ImageHandle) -> Result<Verdict, ClassificationError> {
        if image.file_name.starts_with("crash") {
            panic!("inference backend crashed");
        }
        Ok(Verdict::new(DetectionStatus::Unauthorized, 92, "X"))
    }
}

#[tokio::test]
async fn test_panicking_classifier_errors_only_its_file() {
    let (coordinator, store) = coordinator_with(fast_config(), Arc::new(Crashing));

    let submission = coordinator.submit_batch(vec![png("crash.png"), png("fine.png")]);
    let crashed = &submission.accepted[0];
    let fine = &submission.accepted[1];

    assert_eq!(coordinator.wait_for(crashed).await, Some(FileState::Errored));
    assert_eq!(coordinator.wait_for(fine).await, Some(FileState::Completed));
    coordinator.wait_all().await;

    let status = coordinator.status(crashed).unwrap();
    assert!(status.error.unwrap().contains("classifier panicked"));
    assert_eq!(store.list_detections().len(), 1);
}

#[tokio::test]
async fn test_config_trend_window_applies_to_store() {
    let classifier = FixedClassifier::verdict(Verdict::new(DetectionStatus::Unauthorized, 92, "X"));
    let config = PipelineConfig {
        trend_days: 7,
        ..fast_config()
    };
    let (coordinator, store) = coordinator_with(config, Arc::new(classifier));

    assert_eq!(store.compute_stats().trends_data.len(), 7);
    assert_eq!(coordinator.compute_stats().trends_data.len(), 7);
}
