//! Records held by the detection store.
//!
//! Field names serialize in camelCase, the shape the dashboard consumes.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image reference used for detections synthesized from authorized ads
/// that carry no source image.
pub const PLACEHOLDER_IMAGE: &str = "placeholder://authorized-ad";

/// Generate a record id such as `det_3f2a...`.
pub fn new_record_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Classification status of a detection or region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionStatus {
    Pending,
    Authorized,
    Unauthorized,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::Pending => "Pending",
            DetectionStatus::Authorized => "Authorized",
            DetectionStatus::Unauthorized => "Unauthorized",
        }
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence as a whole percentage, 0..=100.
///
/// Serializes as the display string (`"92%"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Confidence(u8);

impl Confidence {
    pub const FULL: Confidence = Confidence(100);

    /// Values above 100 are clamped.
    pub fn from_percent(percent: u8) -> Self {
        Self(percent.min(100))
    }

    /// Fractions outside 0.0..=1.0 are clamped; NaN maps to zero.
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction.is_nan() {
            return Self(0);
        }
        Self((fraction.clamp(0.0, 1.0) * 100.0).round() as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }

    pub fn fraction(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl From<Confidence> for String {
    fn from(c: Confidence) -> Self {
        c.to_string()
    }
}

impl TryFrom<String> for Confidence {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let digits = value.trim().trim_end_matches('%');
        let percent: u8 = digits
            .parse()
            .map_err(|_| format!("invalid confidence: {}", value))?;
        if percent > 100 {
            return Err(format!("confidence out of range: {}", value));
        }
        Ok(Self(percent))
    }
}

/// Rectangle of interest in source-image pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRegion {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Normalized 0.0..=1.0.
    pub confidence: f64,
    pub text: String,
    pub status: DetectionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

/// A single analyzed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub id: String,
    pub image: String,
    pub text: String,
    pub confidence: Confidence,
    pub status: DetectionStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub bounding_boxes: Vec<BoundingRegion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

impl Detection {
    /// The detection that mirrors an authorized ad.
    pub fn from_authorized_ad(ad: &AuthorizedAd) -> Self {
        Self {
            id: ad.id.clone(),
            image: ad
                .image
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            text: ad.text.clone(),
            confidence: Confidence::FULL,
            status: DetectionStatus::Authorized,
            timestamp: ad.date_added,
            bounding_boxes: Vec::new(),
            location: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Violation,
    Suspicious,
    Warning,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Violation => "violation",
            AlertType::Suspicious => "suspicious",
            AlertType::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    High,
    Medium,
    Low,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::High => "high",
            AlertPriority::Medium => "medium",
            AlertPriority::Low => "low",
        }
    }
}

/// Flags a detection as requiring attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub detection: Detection,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub timestamp: DateTime<Utc>,
}

/// Whitelisted advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedAd {
    pub id: String,
    pub text: String,
    pub added_by: String,
    pub date_added: DateTime<Utc>,
    pub active: bool,
    /// Source image of the upload that produced this ad, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Audit entry correlating a detection with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub id: String,
    pub detection: Detection,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

/// One day of the dashboard trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub detections: usize,
    pub violations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_detections: usize,
    pub unauthorized_ads: usize,
    /// Share of detections that reached a verdict, in percent.
    pub detection_rate: u8,
    pub alerts_today: usize,
    pub trends_data: Vec<TrendPoint>,
}
