//! Live rule — watches its events, evaluates its condition, and triggers
//! the actions that handle its action text.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use homerule_domain::id::RuleId;
use homerule_domain::rule::{JoinOp, ParsedRule};
use homerule_domain::time::Timestamp;
use homerule_domain::value::Value;

use crate::event::Event;
use crate::observer::{Observable, Observer};
use crate::ports::Clock;

/// Value seen by one clause during an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseValue {
    pub clause: String,
    pub event: String,
    pub value: Option<Value>,
    pub result: bool,
}

/// Evaluation context handed to actions when a rule fires.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleTrigger {
    pub rule_id: RuleId,
    pub action_text: String,
    pub condition_text: String,
    /// Event whose update caused the evaluation.
    pub event: String,
    pub value: Option<Value>,
    pub clauses: Vec<ClauseValue>,
    pub at: Timestamp,
}

/// Read-only view of a [`Rule`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSnapshot {
    pub id: RuleId,
    pub text: String,
    pub condition: String,
    pub join: JoinOp,
    pub action: String,
    pub active: bool,
    pub events: Vec<String>,
    pub actions: Vec<String>,
}

/// A parsed rule bound to live events.
///
/// While active, the rule is subscribed to each of its events. Activation
/// creates an `Event → Rule` reference; [`deactivate`](Self::deactivate)
/// drops it again.
pub struct Rule {
    id: RuleId,
    text: String,
    parsed: ParsedRule,
    /// One event per clause, aligned with `parsed.clauses`.
    bindings: Vec<Arc<Event>>,
    active: AtomicBool,
    actions: Observable<RuleTrigger>,
    clock: Arc<dyn Clock>,
}

impl Rule {
    /// Bind `parsed` to its events. The rule starts inactive.
    #[must_use]
    pub fn new(
        id: RuleId,
        text: impl Into<String>,
        parsed: ParsedRule,
        bindings: Vec<Arc<Event>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        debug_assert_eq!(parsed.clauses.len(), bindings.len());
        Self {
            id,
            text: text.into(),
            parsed,
            bindings,
            active: AtomicBool::new(false),
            actions: Observable::new(),
            clock,
        }
    }

    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn parsed(&self) -> &ParsedRule {
        &self.parsed
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Distinct events this rule watches, in clause order.
    #[must_use]
    pub fn events(&self) -> Vec<Arc<Event>> {
        let mut events: Vec<Arc<Event>> = Vec::with_capacity(self.bindings.len());
        for event in &self.bindings {
            if !events.iter().any(|e| e.name() == event.name()) {
                events.push(Arc::clone(event));
            }
        }
        events
    }

    /// Subscribe to every bound event.
    pub fn activate(self: &Arc<Self>) {
        self.active.store(true, Ordering::Release);
        for event in self.events() {
            event.add_observer(Arc::clone(self) as Arc<dyn Observer<Event>>);
        }
        tracing::debug!(rule_id = %self.id, "rule activated");
    }

    /// Unsubscribe from every bound event. Attached actions are kept.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        let key = self.id.to_string();
        for event in self.events() {
            event.remove_observer(&key);
        }
        tracing::debug!(rule_id = %self.id, "rule deactivated");
    }

    /// Attach an action. Idempotent.
    pub fn attach_action(&self, action: Arc<dyn Observer<RuleTrigger>>) -> bool {
        self.actions.subscribe(action)
    }

    pub fn detach_action(&self, key: &str) -> bool {
        self.actions.unsubscribe(key)
    }

    pub fn detach_all_actions(&self) {
        self.actions.clear();
    }

    #[must_use]
    pub fn action_keys(&self) -> Vec<String> {
        self.actions.keys()
    }

    /// Evaluate the condition against the current event values.
    ///
    /// Returns whether the rule fired. Inactive rules never fire. A clause
    /// whose event has no reading yet, or whose values cannot be compared,
    /// counts as false. On a true result every attached action is notified.
    pub fn evaluate(&self, cause: &Event) -> bool {
        if !self.is_active() {
            return false;
        }

        let clauses: Vec<ClauseValue> = self
            .parsed
            .clauses
            .iter()
            .zip(&self.bindings)
            .map(|(clause, event)| {
                let value = event.current_value().map(|v| v.as_value());
                let result = match &value {
                    None => false,
                    Some(actual) => clause.evaluate(actual).unwrap_or_else(|err| {
                        tracing::warn!(
                            rule_id = %self.id,
                            clause = %clause,
                            error = %err,
                            "clause cannot be evaluated, treating it as false"
                        );
                        false
                    }),
                };
                ClauseValue {
                    clause: clause.to_string(),
                    event: event.name().to_string(),
                    value,
                    result,
                }
            })
            .collect();

        let results: Vec<bool> = clauses.iter().map(|c| c.result).collect();
        let fired = self.parsed.join.fold(&results);
        tracing::debug!(rule_id = %self.id, cause = %cause.name(), fired, "rule evaluated");
        if !fired {
            return false;
        }

        let trigger = RuleTrigger {
            rule_id: self.id,
            action_text: self.parsed.action.clone(),
            condition_text: self.parsed.condition_text(),
            event: cause.name().to_string(),
            value: cause.current_value().map(|v| v.as_value()),
            clauses,
            at: self.clock.now(),
        };
        self.actions.notify(&trigger);
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> RuleSnapshot {
        RuleSnapshot {
            id: self.id,
            text: self.text.clone(),
            condition: self.parsed.condition_text(),
            join: self.parsed.join,
            action: self.parsed.action.clone(),
            active: self.is_active(),
            events: self.events().iter().map(|e| e.name().to_string()).collect(),
            actions: self.action_keys(),
        }
    }
}

impl Observer<Event> for Rule {
    fn observer_key(&self) -> String {
        self.id.to_string()
    }

    fn notify(self: Arc<Self>, subject: &Event) {
        self.evaluate(subject);
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("parsed", &self.parsed)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
