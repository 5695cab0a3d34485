//! Anomaly notifier port — the side path taken once per rising edge.

use std::sync::Arc;

use serde::Serialize;

use homerule_domain::event::AnomalyState;

/// Payload handed to the notifier when an anomaly becomes detected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyAlert {
    pub event: String,
    pub location: String,
    pub state: AnomalyState,
    /// Descriptions rule authors used to refer to this anomaly.
    pub descriptions: Vec<String>,
}

/// Receives anomaly alerts. Called synchronously from the reading path, so
/// implementations must not block.
pub trait AnomalyNotifier: Send + Sync {
    fn anomaly_raised(&self, alert: &AnomalyAlert);
}

impl<T: AnomalyNotifier + ?Sized> AnomalyNotifier for Arc<T> {
    fn anomaly_raised(&self, alert: &AnomalyAlert) {
        (**self).anomaly_raised(alert);
    }
}
