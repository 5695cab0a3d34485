//! Live event — a sensor signal with a current value and watching rules.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use homerule_domain::event::{
    AnomalyReading, AnomalyState, EventKind, EventSpec, EventValue, EventValueError, Transition,
};
use homerule_domain::time::Timestamp;
use homerule_domain::value::Value;

use crate::observer::{Observable, Observer};
use crate::ports::{AnomalyAlert, AnomalyNotifier, Clock};

/// A description a rule author used to refer to an anomaly event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundDescription {
    pub description: String,
    pub last_detected_at: Option<Timestamp>,
}

/// Read-only view of an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSnapshot {
    pub name: String,
    pub kind: EventKind,
    pub location: String,
    pub value: Option<EventValue>,
    /// Ids of the rules currently watching this event.
    pub observers: Vec<String>,
    pub descriptions: Vec<BoundDescription>,
}

/// A named sensor signal.
///
/// `update` stores the reading and then notifies every watching rule
/// synchronously, in the order they subscribed. No lock is held while
/// observers run, so a rule may read this event's value during evaluation.
pub struct Event {
    spec: EventSpec,
    value: Mutex<Option<EventValue>>,
    descriptions: Mutex<Vec<BoundDescription>>,
    observers: Observable<Event>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn AnomalyNotifier>,
}

impl Event {
    #[must_use]
    pub fn new(spec: EventSpec, clock: Arc<dyn Clock>, notifier: Arc<dyn AnomalyNotifier>) -> Self {
        Self {
            spec,
            value: Mutex::new(None),
            descriptions: Mutex::new(Vec::new()),
            observers: Observable::new(),
            clock,
            notifier,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.spec.kind
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.spec.location
    }

    #[must_use]
    pub fn spec(&self) -> &EventSpec {
        &self.spec
    }

    /// Latest reading, `None` until the first update.
    #[must_use]
    pub fn current_value(&self) -> Option<EventValue> {
        self.lock_value().clone()
    }

    /// Watch this event. Idempotent.
    pub fn add_observer(&self, observer: Arc<dyn Observer<Event>>) -> bool {
        self.observers.subscribe(observer)
    }

    /// Stop watching this event. Idempotent.
    pub fn remove_observer(&self, key: &str) -> bool {
        self.observers.unsubscribe(key)
    }

    #[must_use]
    pub fn observer_keys(&self) -> Vec<String> {
        self.observers.keys()
    }

    /// Store a new reading and notify watching rules.
    ///
    /// A boolean pushed to an anomaly event is routed through
    /// [`update_anomaly_state`](Self::update_anomaly_state).
    ///
    /// # Errors
    ///
    /// Returns [`EventValueError`] when the reading does not fit this
    /// event's kind; the stored value is left untouched.
    pub fn update(&self, value: &Value) -> Result<(), EventValueError> {
        let reading = self.spec.kind.coerce_reading(&self.spec.name, value)?;
        match (self.spec.kind, reading) {
            (EventKind::Anomaly, EventValue::Bool(detected)) => {
                self.update_anomaly_state(detected, AnomalyReading::default())?;
            }
            (_, reading) => {
                tracing::debug!(event = %self.spec.name, value = %reading, "event updated");
                *self.lock_value() = Some(reading);
                self.observers.notify(self);
            }
        }
        Ok(())
    }

    /// Feed a detector signal through the anomaly state machine, then
    /// notify watching rules.
    ///
    /// Only a rising edge (not detected → detected) raises an
    /// [`AnomalyAlert`] and refreshes the bound descriptions.
    ///
    /// # Errors
    ///
    /// Returns [`EventValueError`] when this is not an anomaly event.
    pub fn update_anomaly_state(
        &self,
        detected: bool,
        reading: AnomalyReading,
    ) -> Result<Transition, EventValueError> {
        if self.spec.kind != EventKind::Anomaly {
            return Err(EventValueError {
                event: self.spec.name.clone(),
                kind: self.spec.kind,
                found: "anomaly state".to_string(),
            });
        }

        let now = self.clock.now();
        let (transition, state) = {
            let mut value = self.lock_value();
            let mut state = match value.take() {
                Some(EventValue::Anomaly(state)) => state,
                _ => AnomalyState::default(),
            };
            let transition = state.apply(detected, reading, now);
            *value = Some(EventValue::Anomaly(state.clone()));
            (transition, state)
        };

        tracing::debug!(event = %self.spec.name, detected, ?transition, "anomaly state updated");
        if transition == Transition::Rising {
            self.raise(state, now);
        }
        self.observers.notify(self);
        Ok(transition)
    }

    /// Record that rule authors refer to this event as `description`.
    pub fn bind_description(&self, description: &str) {
        let mut descriptions = self.lock_descriptions();
        if descriptions.iter().all(|d| d.description != description) {
            descriptions.push(BoundDescription {
                description: description.to_string(),
                last_detected_at: None,
            });
        }
    }

    #[must_use]
    pub fn descriptions(&self) -> Vec<BoundDescription> {
        self.lock_descriptions().clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            name: self.spec.name.clone(),
            kind: self.spec.kind,
            location: self.spec.location.clone(),
            value: self.current_value(),
            observers: self.observer_keys(),
            descriptions: self.descriptions(),
        }
    }

    fn raise(&self, state: AnomalyState, at: Timestamp) {
        let descriptions = {
            let mut bound = self.lock_descriptions();
            for description in bound.iter_mut() {
                description.last_detected_at = Some(at);
            }
            bound.iter().map(|d| d.description.clone()).collect()
        };
        tracing::info!(event = %self.spec.name, location = %self.spec.location, "anomaly detected");
        self.notifier.anomaly_raised(&AnomalyAlert {
            event: self.spec.name.clone(),
            location: self.spec.location.clone(),
            state,
            descriptions,
        });
    }

    fn lock_value(&self) -> std::sync::MutexGuard<'_, Option<EventValue>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_descriptions(&self) -> std::sync::MutexGuard<'_, Vec<BoundDescription>> {
        self.descriptions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("spec", &self.spec)
            .field("value", &self.current_value())
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}
