//! Alert review filters.
//!
//! `DetectionStore::list_alerts` always returns the full collection; these
//! helpers narrow an already-fetched list for review views.

use crate::storage::models::{Alert, AlertPriority, AlertType};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    pub priority: Option<AlertPriority>,
    pub alert_type: Option<AlertType>,
    /// Case-insensitive match against alert id, detection text, and
    /// location address.
    pub search: Option<String>,
}

impl AlertFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: AlertPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn alert_type(mut self, alert_type: AlertType) -> Self {
        self.alert_type = Some(alert_type);
        self
    }

    pub fn search(mut self, query: &str) -> Self {
        let query = query.trim();
        self.search = (!query.is_empty()).then(|| query.to_lowercase());
        self
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        if self.priority.is_some_and(|p| p != alert.priority) {
            return false;
        }
        if self.alert_type.is_some_and(|t| t != alert.alert_type) {
            return false;
        }
        match &self.search {
            None => true,
            Some(query) => {
                alert.id.to_lowercase().contains(query)
                    || alert.detection.text.to_lowercase().contains(query)
                    || alert
                        .detection
                        .location
                        .as_ref()
                        .is_some_and(|l| l.address.to_lowercase().contains(query))
            }
        }
    }

    pub fn apply<'a>(&self, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts.iter().filter(|a| self.matches(a)).collect()
    }
}

pub fn high_priority_count(alerts: &[Alert]) -> usize {
    alerts
        .iter()
        .filter(|a| a.priority == AlertPriority::High)
        .count()
}
