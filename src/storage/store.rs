//! In-memory detection store.
//!
//! Holds the four append-only collections (detections, alerts, authorized
//! ads, results) behind a single lock. Duplicate detection suppression lives
//! here and nowhere else: every path that records a detection goes through
//! `StoreInner::insert_detection`.
//!
//! Invariants after every operation:
//! - each alert's and result's detection id is present exactly once in
//!   `detections`
//! - a detection whose id already exists is never inserted again
//! - collections only grow, in insertion order

use std::collections::HashSet;
use std::io::Write;

use chrono::{DateTime, Local, TimeZone};
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::StoreError;
use crate::storage::models::{
    Alert, AuthorizedAd, DashboardStats, Detection, DetectionResult,
};
use crate::storage::stats::compute_dashboard_stats;

/// Default length of the dashboard trend series.
pub const DEFAULT_TREND_DAYS: u32 = 3;

/// The outcome-specific record committed for a classified file.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeRecord {
    Authorized(AuthorizedAd),
    Flagged(Alert),
}

/// Everything a single file writes to the store, committed all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub record: OutcomeRecord,
    pub result: DetectionResult,
}

impl FileOutcome {
    /// Id of the detection the ad or alert record brings in.
    fn record_detection_id(&self) -> &str {
        match &self.record {
            OutcomeRecord::Authorized(ad) => &ad.id,
            OutcomeRecord::Flagged(alert) => &alert.detection.id,
        }
    }

    fn validate(&self) -> Result<(), StoreError> {
        let record_id = match &self.record {
            OutcomeRecord::Authorized(ad) => &ad.id,
            OutcomeRecord::Flagged(alert) => &alert.id,
        };
        let detection_id = self.record_detection_id();
        if record_id.is_empty() {
            return Err(StoreError::InvalidRecord("empty record id".to_string()));
        }
        if detection_id.is_empty() || self.result.detection.id.is_empty() {
            return Err(StoreError::InvalidRecord("empty detection id".to_string()));
        }
        if self.result.id.is_empty() {
            return Err(StoreError::InvalidRecord("empty result id".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum JournalRef {
    Detection(usize),
    Alert(usize),
    AuthorizedAd(usize),
    Result(usize),
}

#[derive(Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
enum JournalLine<'a> {
    Detection(&'a Detection),
    Alert(&'a Alert),
    AuthorizedAd(&'a AuthorizedAd),
    Result(&'a DetectionResult),
}

#[derive(Debug, Default)]
struct StoreInner {
    detections: Vec<Detection>,
    detection_ids: HashSet<String>,
    alerts: Vec<Alert>,
    authorized_ads: Vec<AuthorizedAd>,
    results: Vec<DetectionResult>,
    journal: Vec<JournalRef>,
    closed: bool,
}

impl StoreInner {
    fn record_count(&self) -> usize {
        self.detections.len() + self.alerts.len() + self.authorized_ads.len() + self.results.len()
    }

    /// Exact number of records `outcome` would add: the ad or alert, the
    /// result, and each of its detections not already stored.
    fn growth(&self, outcome: &FileOutcome) -> usize {
        let record_detection = outcome.record_detection_id();
        let result_detection = outcome.result.detection.id.as_str();

        let mut growth = 2;
        if !self.detection_ids.contains(record_detection) {
            growth += 1;
        }
        if result_detection != record_detection && !self.detection_ids.contains(result_detection) {
            growth += 1;
        }
        growth
    }

    fn insert_detection(&mut self, detection: Detection) -> bool {
        if self.detection_ids.contains(&detection.id) {
            log::debug!("STORE_DETECTION_DUPLICATE id={}", detection.id);
            return false;
        }
        self.detection_ids.insert(detection.id.clone());
        self.journal.push(JournalRef::Detection(self.detections.len()));
        self.detections.push(detection);
        true
    }

    fn insert_alert(&mut self, alert: Alert) {
        self.insert_detection(alert.detection.clone());
        self.journal.push(JournalRef::Alert(self.alerts.len()));
        self.alerts.push(alert);
    }

    fn insert_authorized_ad(&mut self, ad: AuthorizedAd) {
        let detection = Detection::from_authorized_ad(&ad);
        self.journal.push(JournalRef::AuthorizedAd(self.authorized_ads.len()));
        self.authorized_ads.push(ad);
        self.insert_detection(detection);
    }

    fn insert_result(&mut self, result: DetectionResult) {
        self.insert_detection(result.detection.clone());
        self.journal.push(JournalRef::Result(self.results.len()));
        self.results.push(result);
    }
}

/// Authoritative store shared by the coordinator and every file task.
///
/// Writes take the lock exclusively, so a write that has returned is
/// visible to every later read from any task.
#[derive(Debug)]
pub struct DetectionStore {
    inner: RwLock<StoreInner>,
    limits: RwLock<StoreLimits>,
}

#[derive(Debug, Clone, Copy)]
struct StoreLimits {
    capacity: Option<usize>,
    trend_days: u32,
}

impl Default for DetectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            limits: RwLock::new(StoreLimits {
                capacity: None,
                trend_days: DEFAULT_TREND_DAYS,
            }),
        }
    }

    /// An empty store sized and windowed by `config`.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new()
            .with_capacity_limit(config.store_capacity)
            .with_trend_days(config.trend_days)
    }

    /// Cap the total number of records outcome commits may grow the store to.
    pub fn with_capacity_limit(mut self, capacity: Option<usize>) -> Self {
        self.limits.get_mut().capacity = capacity;
        self
    }

    pub fn with_trend_days(mut self, days: u32) -> Self {
        self.limits.get_mut().trend_days = days.max(1);
        self
    }

    /// Replace the capacity cap and trend window of a shared store.
    pub fn apply_config(&self, config: &PipelineConfig) {
        let mut limits = self.limits.write();
        limits.capacity = config.store_capacity;
        limits.trend_days = config.trend_days.max(1);
    }

    pub fn capacity_limit(&self) -> Option<usize> {
        self.limits.read().capacity
    }

    pub fn trend_days(&self) -> u32 {
        self.limits.read().trend_days
    }

    /// Insert a detection unless one with the same id exists.
    ///
    /// Returns whether the detection was added.
    pub fn insert_detection(&self, detection: Detection) -> bool {
        self.inner.write().insert_detection(detection)
    }

    /// Append an alert, recording its detection first if absent.
    pub fn insert_alert(&self, alert: Alert) {
        self.inner.write().insert_alert(alert);
    }

    /// Append an authorized ad along with its mirrored detection.
    pub fn insert_authorized_ad(&self, ad: AuthorizedAd) {
        self.inner.write().insert_authorized_ad(ad);
    }

    /// Append a result, recording its detection first if absent.
    pub fn insert_result(&self, result: DetectionResult) {
        self.inner.write().insert_result(result);
    }

    /// Commit a file's outcome record and result atomically.
    ///
    /// Either every write lands or none does.
    pub fn commit(&self, outcome: FileOutcome) -> Result<(), StoreError> {
        outcome.validate()?;

        let mut inner = self.inner.write();
        if inner.closed {
            return Err(StoreError::Closed);
        }
        if let Some(limit) = self.capacity_limit() {
            if inner.record_count() + inner.growth(&outcome) > limit {
                return Err(StoreError::CapacityExceeded { limit });
            }
        }

        match outcome.record {
            OutcomeRecord::Authorized(ad) => inner.insert_authorized_ad(ad),
            OutcomeRecord::Flagged(alert) => inner.insert_alert(alert),
        }
        inner.insert_result(outcome.result);
        Ok(())
    }

    /// Refuse further outcome commits.
    pub fn close(&self) {
        self.inner.write().closed = true;
        log::info!("STORE_CLOSED");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }

    pub fn list_detections(&self) -> Vec<Detection> {
        self.inner.read().detections.clone()
    }

    pub fn list_alerts(&self) -> Vec<Alert> {
        self.inner.read().alerts.clone()
    }

    pub fn list_authorized_ads(&self) -> Vec<AuthorizedAd> {
        self.inner.read().authorized_ads.clone()
    }

    pub fn list_results(&self) -> Vec<DetectionResult> {
        self.inner.read().results.clone()
    }

    pub fn detection(&self, id: &str) -> Option<Detection> {
        self.inner
            .read()
            .detections
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    pub fn contains_detection(&self, id: &str) -> bool {
        self.inner.read().detection_ids.contains(id)
    }

    pub fn detection_count(&self) -> usize {
        self.inner.read().detections.len()
    }

    /// Dashboard statistics relative to the local calendar day.
    pub fn compute_stats(&self) -> DashboardStats {
        self.compute_stats_at(&Local::now())
    }

    /// Dashboard statistics relative to `now`'s calendar day in its own
    /// time zone.
    pub fn compute_stats_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DashboardStats {
        let trend_days = self.trend_days();
        let inner = self.inner.read();
        compute_dashboard_stats(&inner.detections, &inner.alerts, now, trend_days)
    }

    /// Write every recorded entry as one JSON line, in insertion order.
    pub fn write_journal<W: Write>(&self, mut writer: W) -> std::io::Result<usize> {
        let inner = self.inner.read();
        for entry in &inner.journal {
            let line = match *entry {
                JournalRef::Detection(i) => JournalLine::Detection(&inner.detections[i]),
                JournalRef::Alert(i) => JournalLine::Alert(&inner.alerts[i]),
                JournalRef::AuthorizedAd(i) => JournalLine::AuthorizedAd(&inner.authorized_ads[i]),
                JournalRef::Result(i) => JournalLine::Result(&inner.results[i]),
            };
            serde_json::to_writer(&mut writer, &line)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(inner.journal.len())
    }
}
