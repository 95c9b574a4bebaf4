//! Sample detections used to populate a demo dashboard.

use chrono::{DateTime, TimeZone, Utc};

use crate::storage::models::{
    BoundingRegion, Confidence, Detection, DetectionStatus, GeoLocation,
};
use crate::storage::store::DetectionStore;

fn sample_timestamp(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 22, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

fn sample(
    id: &str,
    region_id: &str,
    image: &str,
    text: &str,
    percent: u8,
    status: DetectionStatus,
    (hour, minute): (u32, u32),
    (x, y, width, height): (u32, u32, u32, u32),
    location: Option<GeoLocation>,
) -> Detection {
    let confidence = Confidence::from_percent(percent);
    Detection {
        id: id.to_string(),
        image: image.to_string(),
        text: text.to_string(),
        confidence,
        status,
        timestamp: sample_timestamp(hour, minute),
        bounding_boxes: vec![BoundingRegion {
            id: region_id.to_string(),
            x,
            y,
            width,
            height,
            confidence: confidence.fraction(),
            text: text.to_string(),
            status,
        }],
        location,
    }
}

pub fn sample_detections() -> Vec<Detection> {
    vec![
        sample(
            "A123",
            "bb1",
            "https://images.unsplash.com/photo-1449824913935-59a10b8d2000?w=800&h=600&fit=crop",
            "Unauthorized Fast Food Advertisement",
            92,
            DetectionStatus::Unauthorized,
            (14, 35),
            (120, 80, 300, 150),
            Some(GeoLocation {
                lat: 40.7128,
                lng: -74.0060,
                address: "5th Avenue, Manhattan, NY".to_string(),
            }),
        ),
        sample(
            "C789",
            "bb3",
            "https://images.unsplash.com/photo-1519501025264-65ba15a82390?w=800&h=600&fit=crop",
            "Crypto Investment Scam Alert",
            96,
            DetectionStatus::Unauthorized,
            (12, 15),
            (50, 50, 500, 300),
            None,
        ),
        sample(
            "D012",
            "bb4",
            "https://images.unsplash.com/photo-1480714378408-67cf0d13bc1f?w=800&h=600&fit=crop",
            "Public Health Safety Notice",
            85,
            DetectionStatus::Pending,
            (11, 45),
            (100, 120, 350, 180),
            None,
        ),
    ]
}

impl DetectionStore {
    /// A store pre-populated with the sample detections.
    pub fn with_sample_data() -> Self {
        let store = Self::new();
        for detection in sample_detections() {
            store.insert_detection(detection);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_store() {
        let store = DetectionStore::with_sample_data();
        let ids: Vec<String> = store.list_detections().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["A123", "C789", "D012"]);
        assert!(store.list_alerts().is_empty());
    }

    #[test]
    fn test_sample_region_confidence_matches_detection() {
        for detection in sample_detections() {
            let region = &detection.bounding_boxes[0];
            assert_eq!(Confidence::from_fraction(region.confidence), detection.confidence);
        }
    }
}
