//! Pipeline configuration.
//!
//! Built from defaults, optionally overlaid with a JSON document and
//! `DEEPSIGHT_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default upload size limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Raster image types accepted at intake.
pub const DEFAULT_ACCEPTED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/bmp",
    "image/webp",
];

const ENV_PREFIX: &str = "DEEPSIGHT_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_upload_bytes: u64,
    pub accepted_mime_types: Vec<String>,
    /// Progress increment per upload tick, in percent.
    pub progress_step: u8,
    pub progress_tick_ms: u64,
    pub classifier_timeout_ms: u64,
    pub simulated_delay_min_ms: u64,
    pub simulated_delay_max_ms: u64,
    /// Number of days in the dashboard trend series, today included.
    pub trend_days: u32,
    /// Upper bound on total stored records; `None` means unbounded.
    pub store_capacity: Option<usize>,
    pub event_buffer: usize,
    pub authorizing_actor: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_mime_types: DEFAULT_ACCEPTED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            progress_step: 10,
            progress_tick_ms: 100,
            classifier_timeout_ms: 10_000,
            simulated_delay_min_ms: 500,
            simulated_delay_max_ms: 2_000,
            trend_days: 3,
            store_capacity: None,
            event_buffer: 256,
            authorizing_actor: "system".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        self.accepted_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime_type))
    }

    /// Parse a JSON document; missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `DEEPSIGHT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (keys are full variable names,
    /// e.g. `DEEPSIGHT_MAX_UPLOAD_BYTES`).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(v) = get("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_field("max_upload_bytes", &v)?;
        }
        if let Some(v) = get("ACCEPTED_MIME_TYPES") {
            self.accepted_mime_types = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("PROGRESS_STEP") {
            self.progress_step = parse_field("progress_step", &v)?;
        }
        if let Some(v) = get("PROGRESS_TICK_MS") {
            self.progress_tick_ms = parse_field("progress_tick_ms", &v)?;
        }
        if let Some(v) = get("CLASSIFIER_TIMEOUT_MS") {
            self.classifier_timeout_ms = parse_field("classifier_timeout_ms", &v)?;
        }
        if let Some(v) = get("TREND_DAYS") {
            self.trend_days = parse_field("trend_days", &v)?;
        }
        if let Some(v) = get("STORE_CAPACITY") {
            self.store_capacity = Some(parse_field("store_capacity", &v)?);
        }
        if let Some(v) = get("AUTHORIZING_ACTOR") {
            self.authorizing_actor = v;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_step == 0 || self.progress_step > 100 {
            return Err(ConfigError::Invalid {
                field: "progress_step",
                reason: format!("must be in 1..=100, got {}", self.progress_step),
            });
        }
        if self.classifier_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "classifier_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.accepted_mime_types.is_empty() {
            return Err(ConfigError::Invalid {
                field: "accepted_mime_types",
                reason: "at least one type is required".to_string(),
            });
        }
        if self.simulated_delay_min_ms > self.simulated_delay_max_ms {
            return Err(ConfigError::Invalid {
                field: "simulated_delay_min_ms",
                reason: "must not exceed simulated_delay_max_ms".to_string(),
            });
        }
        if self.trend_days == 0 {
            return Err(ConfigError::Invalid {
                field: "trend_days",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid {
                field: "event_buffer",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.accepts_mime("image/PNG"));
        assert!(!config.accepts_mime("application/pdf"));
    }

    #[test]
    fn test_from_json_partial() {
        let config = PipelineConfig::from_json(r#"{"classifier_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.classifier_timeout(), Duration::from_millis(250));
        assert_eq!(config.progress_step, 10);
    }

    #[test]
    fn test_from_json_rejects_zero_step() {
        let err = PipelineConfig::from_json(r#"{"progress_step": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "progress_step", .. }));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DEEPSIGHT_MAX_UPLOAD_BYTES", "2048"),
            ("DEEPSIGHT_ACCEPTED_MIME_TYPES", "image/png, image/gif"),
            ("DEEPSIGHT_STORE_CAPACITY", "12"),
        ]);
        let config = PipelineConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.max_upload_bytes, 2048);
        assert_eq!(config.accepted_mime_types, vec!["image/png", "image/gif"]);
        assert_eq!(config.store_capacity, Some(12));
    }

    #[test]
    fn test_override_parse_error() {
        let err = PipelineConfig::default()
            .with_overrides(|k| (k == "DEEPSIGHT_PROGRESS_TICK_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "progress_tick_ms", .. }));
    }
}
