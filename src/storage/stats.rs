//! Dashboard statistics.
//!
//! "Today" means the calendar day of `now` in `now`'s own time zone, not a
//! rolling 24-hour window.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

use crate::storage::models::{
    Alert, AlertType, DashboardStats, Detection, DetectionStatus, TrendPoint,
};

fn local_date<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

pub fn compute_dashboard_stats<Tz: TimeZone>(
    detections: &[Detection],
    alerts: &[Alert],
    now: &DateTime<Tz>,
    trend_days: u32,
) -> DashboardStats {
    let tz = now.timezone();
    let today = now.date_naive();

    let alerts_today = alerts
        .iter()
        .filter(|a| local_date(&a.timestamp, &tz) == today)
        .count();

    let classified = detections
        .iter()
        .filter(|d| d.status != DetectionStatus::Pending)
        .count();
    let detection_rate = if detections.is_empty() {
        0
    } else {
        ((classified as f64 / detections.len() as f64) * 100.0).round() as u8
    };

    let trends_data = (0..trend_days.max(1))
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|date| TrendPoint {
            date,
            detections: detections
                .iter()
                .filter(|d| local_date(&d.timestamp, &tz) == date)
                .count(),
            violations: alerts
                .iter()
                .filter(|a| a.alert_type == AlertType::Violation)
                .filter(|a| local_date(&a.timestamp, &tz) == date)
                .count(),
        })
        .collect();

    DashboardStats {
        total_detections: detections.len(),
        unauthorized_ads: alerts.len(),
        detection_rate,
        alerts_today,
        trends_data,
    }
}
