//! Routing decision logic.
//!
//! Decides which branch a classified file takes: the authorized-ad registry
//! or the alert feed.

use crate::classifier::adapter::Verdict;
use crate::logging::structured::LogContext;
use crate::storage::models::{AlertPriority, AlertType, DetectionStatus};

/// Routing decision for a classified file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    AuthorizedAd,
    Alert {
        alert_type: AlertType,
        priority: AlertPriority,
    },
}

impl RoutingDecision {
    pub fn as_str(&self) -> &str {
        match self {
            RoutingDecision::AuthorizedAd => "authorized_ad",
            RoutingDecision::Alert { .. } => "alert",
        }
    }
}

/// Alert priority from verdict confidence.
///
/// - 90% and above -> high
/// - 80% to 89% -> medium
/// - below 80% -> low
pub fn priority_for(confidence_percent: u8) -> AlertPriority {
    match confidence_percent {
        90..=u8::MAX => AlertPriority::High,
        80..=89 => AlertPriority::Medium,
        _ => AlertPriority::Low,
    }
}

/// Determine routing for a verdict.
///
/// # Decision Tree
/// 1. Authorized -> AuthorizedAd
/// 2. Unauthorized -> Alert(violation)
/// 3. Pending -> Alert(suspicious)
pub fn determine_routing(verdict: &Verdict, ctx: &LogContext) -> RoutingDecision {
    let alert_type = match verdict.status {
        DetectionStatus::Authorized => {
            log::debug!(
                "{} ROUTING_DECISION destination=authorized_ad confidence={}",
                ctx,
                verdict.confidence().percent()
            );
            return RoutingDecision::AuthorizedAd;
        }
        DetectionStatus::Unauthorized => AlertType::Violation,
        DetectionStatus::Pending => AlertType::Suspicious,
    };

    let priority = priority_for(verdict.confidence().percent());
    crate::log_info!(
        ctx,
        "ROUTING_DECISION",
        destination = "alert",
        alert_type = alert_type,
        priority = priority,
        confidence = verdict.confidence().percent()
    );

    RoutingDecision::Alert {
        alert_type,
        priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorized_routing() {
        let ctx = LogContext::new("test-batch");
        let verdict = Verdict::new(DetectionStatus::Authorized, 88, "ok");

        let decision = determine_routing(&verdict, &ctx);
        assert_eq!(decision, RoutingDecision::AuthorizedAd);
        assert_eq!(decision.as_str(), "authorized_ad");
    }

    #[test]
    fn test_unauthorized_routing() {
        let ctx = LogContext::new("test-batch");
        let verdict = Verdict::new(DetectionStatus::Unauthorized, 92, "X");

        let decision = determine_routing(&verdict, &ctx);
        assert_eq!(
            decision,
            RoutingDecision::Alert {
                alert_type: AlertType::Violation,
                priority: AlertPriority::High,
            }
        );
    }

    #[test]
    fn test_pending_routing() {
        let ctx = LogContext::new("test-batch");
        let verdict = Verdict::new(DetectionStatus::Pending, 70, "?");

        let decision = determine_routing(&verdict, &ctx);
        assert_eq!(
            decision,
            RoutingDecision::Alert {
                alert_type: AlertType::Suspicious,
                priority: AlertPriority::Low,
            }
        );
    }

    #[test]
    fn test_fraction_only_verdict_priority() {
        let ctx = LogContext::new("test-batch");
        let verdict = Verdict {
            confidence_percent: 0,
            confidence_fraction: 0.93,
            ..Verdict::new(DetectionStatus::Unauthorized, 0, "X")
        };

        assert_eq!(
            determine_routing(&verdict, &ctx),
            RoutingDecision::Alert {
                alert_type: AlertType::Violation,
                priority: AlertPriority::High,
            }
        );
    }

    #[test]
    fn test_priority_bands() {
        assert_eq!(priority_for(100), AlertPriority::High);
        assert_eq!(priority_for(90), AlertPriority::High);
        assert_eq!(priority_for(89), AlertPriority::Medium);
        assert_eq!(priority_for(80), AlertPriority::Medium);
        assert_eq!(priority_for(79), AlertPriority::Low);
        assert_eq!(priority_for(0), AlertPriority::Low);
    }
}
