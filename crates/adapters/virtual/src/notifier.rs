//! Anomaly notifier that logs alerts.

use std::sync::{Mutex, PoisonError};

use homerule_app::ports::{AnomalyAlert, AnomalyNotifier};

use crate::history::History;

/// Logs every alert at `warn` and keeps copies of the most recent ones.
#[derive(Debug, Default)]
pub struct LoggingNotifier {
    alerts: Mutex<History<AnomalyAlert>>,
}

impl LoggingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the last `limit` alerts; `0` only logs.
    #[must_use]
    pub fn with_history(limit: usize) -> Self {
        Self {
            alerts: Mutex::new(History::with_limit(limit)),
        }
    }

    /// Recent alerts, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<AnomalyAlert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .to_vec()
    }
}

impl AnomalyNotifier for LoggingNotifier {
    fn anomaly_raised(&self, alert: &AnomalyAlert) {
        tracing::warn!(
            event = %alert.event,
            location = %alert.location,
            confidence = ?alert.state.confidence,
            anomaly_type = ?alert.state.anomaly_type,
            descriptions = ?alert.descriptions,
            "anomaly detected"
        );
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert.clone());
    }
}

#[cfg(test)]
mod tests {
    use homerule_domain::event::AnomalyState;

    use super::*;

    fn raise(notifier: &LoggingNotifier, event: &str) {
        notifier.anomaly_raised(&AnomalyAlert {
            event: event.to_string(),
            location: "lab".to_string(),
            state: AnomalyState {
                detected: true,
                ..AnomalyState::default()
            },
            descriptions: Vec::new(),
        });
    }

    #[test]
    fn should_keep_alerts_in_order() {
        let notifier = LoggingNotifier::new();
        for event in ["a", "b"] {
            raise(&notifier, event);
        }
        let events: Vec<String> = notifier.alerts().into_iter().map(|a| a.event).collect();
        assert_eq!(events, vec!["a", "b"]);
    }

    #[test]
    fn should_forget_oldest_alerts_past_history_limit() {
        let notifier = LoggingNotifier::with_history(1);
        for event in ["a", "b", "c"] {
            raise(&notifier, event);
        }
        let events: Vec<String> = notifier.alerts().into_iter().map(|a| a.event).collect();
        assert_eq!(events, vec!["c"]);
    }
}
