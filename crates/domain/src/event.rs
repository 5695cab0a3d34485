//! Event — a named, typed sensor signal.
//!
//! The domain only knows what an event *is* and which readings fit it.
//! The live, observable event (current value plus watching rules) is
//! assembled in the `app` crate.

mod anomaly;

pub use anomaly::{AnomalyReading, AnomalyState, Transition};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value::Value;

/// Sensor family an event belongs to; decides the shape of its readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Temperature,
    Humidity,
    Motion,
    Anomaly,
}

impl EventKind {
    /// Whether readings of this kind are numbers (otherwise booleans).
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Temperature | Self::Humidity)
    }

    /// Check that `value` fits this kind and lower it to an [`EventValue`].
    ///
    /// Numeric kinds take finite numbers, `Motion` and `Anomaly` take
    /// booleans (`on`/`off`, `yes`/`no` spelled as text are accepted). An
    /// anomaly reading comes back as a bare [`EventValue::Bool`]; the caller
    /// feeds it through [`AnomalyState::apply`].
    ///
    /// # Errors
    ///
    /// Returns [`EventValueError`] when the reading has the wrong shape.
    pub fn coerce_reading(self, event: &str, value: &Value) -> Result<EventValue, EventValueError> {
        let coerced = if self.is_numeric() {
            value
                .as_number()
                .filter(|n| n.is_finite())
                .map(EventValue::Number)
        } else {
            value.as_bool().map(EventValue::Bool)
        };
        coerced.ok_or_else(|| EventValueError {
            event: event.to_string(),
            kind: self,
            found: value.to_string(),
        })
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => f.write_str("temperature"),
            Self::Humidity => f.write_str("humidity"),
            Self::Motion => f.write_str("motion"),
            Self::Anomaly => f.write_str("anomaly"),
        }
    }
}

/// Current value held by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Number(f64),
    Bool(bool),
    Anomaly(AnomalyState),
}

impl EventValue {
    /// Lower to a comparison [`Value`]; an anomaly compares as its
    /// `detected` flag.
    #[must_use]
    pub fn as_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(*n),
            Self::Bool(b) => Value::Bool(*b),
            Self::Anomaly(state) => Value::Bool(state.detected),
        }
    }
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_value().fmt(f)
    }
}

/// A reading does not fit the event it was pushed to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event `{event}` is a {kind} event and cannot take `{found}`")]
pub struct EventValueError {
    pub event: String,
    pub kind: EventKind,
    pub found: String,
}

/// Normalize an event name: lowercase, single spaces.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Static description of an event, as found in a sensor inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpec {
    pub name: String,
    pub kind: EventKind,
    pub location: String,
}

impl EventSpec {
    /// Build a spec with normalized name and location.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the name or location is blank.
    pub fn new(
        name: impl AsRef<str>,
        kind: EventKind,
        location: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        let name = normalize_name(name.as_ref());
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let location = normalize_name(location.as_ref());
        if location.is_empty() {
            return Err(ValidationError::EmptyLocation);
        }
        Ok(Self {
            name,
            kind,
            location,
        })
    }
}
