//! Randomized stand-in for a real detection model.
//!
//! All randomness in the pipeline lives here: processing delay, verdict,
//! confidence, region placement, and location.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::classifier::adapter::{Classifier, RegionVerdict, Verdict};
use crate::config::PipelineConfig;
use crate::error::ClassificationError;
use crate::intake::upload::ImageHandle;
use crate::storage::models::{DetectionStatus, GeoLocation};

pub const AUTHORIZED_LABEL: &str = "Authorized Advertisement";
pub const UNAUTHORIZED_LABEL: &str = "Potential Unauthorized Advertisement";
const SIMULATED_ADDRESS: &str = "123 Test Street, Sample City";

#[derive(Debug)]
pub struct SimulatedClassifier {
    rng: Mutex<StdRng>,
    delay_min: Duration,
    delay_max: Duration,
    /// Probability of an authorized verdict.
    authorized_ratio: f64,
}

impl SimulatedClassifier {
    pub fn new(delay_min: Duration, delay_max: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            delay_min,
            delay_max: delay_max.max(delay_min),
            authorized_ratio: 0.5,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Duration::from_millis(config.simulated_delay_min_ms),
            Duration::from_millis(config.simulated_delay_max_ms),
        )
    }

    /// Deterministic sequence of verdicts for a given seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_authorized_ratio(mut self, ratio: f64) -> Self {
        self.authorized_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    fn draw(&self) -> (Duration, Verdict) {
        let mut rng = self.rng.lock();

        let delay = if self.delay_max > self.delay_min {
            rng.gen_range(self.delay_min..=self.delay_max)
        } else {
            self.delay_min
        };

        let authorized = rng.gen_bool(self.authorized_ratio);
        let (status, label) = if authorized {
            (DetectionStatus::Authorized, AUTHORIZED_LABEL)
        } else {
            (DetectionStatus::Unauthorized, UNAUTHORIZED_LABEL)
        };

        let confidence_percent: u8 = rng.gen_range(75..95);
        let region = RegionVerdict {
            x: rng.gen_range(50..150),
            y: rng.gen_range(50..150),
            width: rng.gen_range(200..400),
            height: rng.gen_range(100..200),
            confidence_fraction: rng.gen_range(0.7..1.0),
            label: label.to_string(),
            status,
        };
        let location = GeoLocation {
            lat: rng.gen_range(-90.0..90.0),
            lng: rng.gen_range(-180.0..180.0),
            address: SIMULATED_ADDRESS.to_string(),
        };

        let verdict = Verdict {
            status,
            confidence_percent,
            confidence_fraction: f64::from(confidence_percent) / 100.0,
            label: label.to_string(),
            regions: vec![region],
            location: Some(location),
        };
        (delay, verdict)
    }
}

#[async_trait]
impl Classifier for SimulatedClassifier {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn classify(&self, image: &ImageHandle) -> Result<Verdict, ClassificationError> {
        let (delay, verdict) = self.draw();
        log::debug!(
            "CLASSIFIER_SIMULATE uri={} delay_ms={} status={}",
            image.uri,
            delay.as_millis(),
            verdict.status
        );
        tokio::time::sleep(delay).await;
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn image() -> ImageHandle {
        ImageHandle {
            uri: "preview://test".to_string(),
            file_name: "a.png".to_string(),
            mime_type: "image/png".to_string(),
            content_hash: String::new(),
            bytes: Arc::from(vec![0u8; 4]),
        }
    }

    #[tokio::test]
    async fn test_verdict_ranges() {
        let classifier = SimulatedClassifier::new(Duration::ZERO, Duration::from_millis(2)).with_seed(7);
        for _ in 0..50 {
            let verdict = classifier.classify(&image()).await.unwrap();
            assert!((75..95).contains(&verdict.confidence_percent));
            assert_ne!(verdict.status, DetectionStatus::Pending);
            assert_eq!(verdict.regions.len(), 1);
            let region = &verdict.regions[0];
            assert!(region.confidence_fraction >= 0.7 && region.confidence_fraction < 1.0);
            assert_eq!(region.status, verdict.status);
        }
    }

    #[tokio::test]
    async fn test_ratio_extremes() {
        let always = SimulatedClassifier::new(Duration::ZERO, Duration::ZERO).with_authorized_ratio(1.0);
        assert_eq!(always.classify(&image()).await.unwrap().status, DetectionStatus::Authorized);

        let never = SimulatedClassifier::new(Duration::ZERO, Duration::ZERO).with_authorized_ratio(0.0);
        assert_eq!(never.classify(&image()).await.unwrap().status, DetectionStatus::Unauthorized);
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let a = SimulatedClassifier::new(Duration::ZERO, Duration::from_millis(10)).with_seed(42);
        let b = SimulatedClassifier::new(Duration::ZERO, Duration::from_millis(10)).with_seed(42);
        assert_eq!(a.draw(), b.draw());
    }
}
