//! Anomaly state — the detected / not-detected state machine carried by
//! anomaly events.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Extra detector output attached to a detected / cleared signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReading {
    pub confidence: Option<f64>,
    pub metric_type: Option<String>,
    pub anomaly_type: Option<String>,
}

/// Composite value of an anomaly event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyState {
    pub detected: bool,
    pub confidence: Option<f64>,
    pub metric_type: Option<String>,
    pub anomaly_type: Option<String>,
    pub last_transition_at: Option<Timestamp>,
}

/// Edge produced by one [`AnomalyState::apply`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// not detected → detected
    Rising,
    /// detected → not detected
    Falling,
    Unchanged,
}

impl AnomalyState {
    /// Record a new detector signal and report the edge it produced.
    ///
    /// Metadata absent from `reading` keeps its previous value.
    /// `last_transition_at` only moves on an actual edge.
    pub fn apply(&mut self, detected: bool, reading: AnomalyReading, at: Timestamp) -> Transition {
        let transition = match (self.detected, detected) {
            (false, true) => Transition::Rising,
            (true, false) => Transition::Falling,
            _ => Transition::Unchanged,
        };

        self.detected = detected;
        if reading.confidence.is_some() {
            self.confidence = reading.confidence;
        }
        if reading.metric_type.is_some() {
            self.metric_type = reading.metric_type;
        }
        if reading.anomaly_type.is_some() {
            self.anomaly_type = reading.anomaly_type;
        }
        if transition != Transition::Unchanged {
            self.last_transition_at = Some(at);
        }
        transition
    }
}
