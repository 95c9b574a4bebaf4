//! Classifier boundary.
//!
//! The pipeline treats the classifier as an opaque, possibly slow black box.
//! Implementations must not fail for a payload that passed intake; the
//! coordinator bounds every call with a timeout regardless.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClassificationError;
use crate::intake::upload::ImageHandle;
use crate::storage::models::{Confidence, DetectionStatus, GeoLocation};

/// Region of interest reported by a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionVerdict {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence_fraction: f64,
    pub label: String,
    pub status: DetectionStatus,
}

/// Classifier response for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub status: DetectionStatus,
    pub confidence_percent: u8,
    pub confidence_fraction: f64,
    pub label: String,
    pub regions: Vec<RegionVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

impl Verdict {
    /// Verdict with a single full-frame region carrying the same label.
    pub fn new(status: DetectionStatus, confidence_percent: u8, label: &str) -> Self {
        let confidence = Confidence::from_percent(confidence_percent);
        Self {
            status,
            confidence_percent: confidence.percent(),
            confidence_fraction: confidence.fraction(),
            label: label.to_string(),
            regions: vec![RegionVerdict {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
                confidence_fraction: confidence.fraction(),
                label: label.to_string(),
                status,
            }],
            location: None,
        }
    }

    /// Overall confidence. `confidence_percent` wins; a classifier that only
    /// fills `confidence_fraction` (percent left at 0) is read from the
    /// fraction.
    pub fn confidence(&self) -> Confidence {
        if self.confidence_percent == 0 && self.confidence_fraction > 0.0 {
            return Confidence::from_fraction(self.confidence_fraction);
        }
        Confidence::from_percent(self.confidence_percent)
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classifier name for logging.
    fn name(&self) -> &str;

    /// Classify one accepted image.
    async fn classify(&self, image: &ImageHandle) -> Result<Verdict, ClassificationError>;
}
