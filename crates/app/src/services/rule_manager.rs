//! Rule manager — creates, deletes, toggles and reloads rules, and feeds
//! readings into events.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use homerule_domain::action::ActionSpec;
use homerule_domain::error::{NotFoundError, RuleEngineError, UnresolvedEventError};
use homerule_domain::event::{AnomalyReading, EventSpec, Transition, normalize_name};
use homerule_domain::id::RuleId;
use homerule_domain::rule::{ParsedRule, parse_rule};
use homerule_domain::value::Value;

use crate::action::{Action, ActionSnapshot};
use crate::context::EngineContext;
use crate::event::{Event, EventSnapshot};
use crate::observer::Observer;
use crate::ports::{AnomalyDescriptionLookup, DeviceGateway};
use crate::rule::{Rule, RuleSnapshot, RuleTrigger};

/// One entry of the authoritative rule list kept by an external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub text: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RuleRecord {
    #[must_use]
    pub fn active(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            active: true,
        }
    }
}

/// Orchestrates the observer graph: events → rules → actions.
pub struct RuleManager<G, L> {
    context: EngineContext<G>,
    lookup: L,
}

impl<G, L> RuleManager<G, L>
where
    G: DeviceGateway,
    L: AnomalyDescriptionLookup,
{
    /// Create a manager over `context`, resolving anomaly descriptions
    /// through `lookup`.
    pub fn new(context: EngineContext<G>, lookup: L) -> Self {
        Self { context, lookup }
    }

    #[must_use]
    pub fn context(&self) -> &EngineContext<G> {
        &self.context
    }

    /// Register a sensor. Registering a known name returns the existing
    /// event.
    #[tracing::instrument(skip(self), fields(event = %spec.name))]
    pub fn register_event(&mut self, spec: EventSpec) -> Arc<Event> {
        let event = self.context.new_event(spec);
        self.context.events.register(event)
    }

    /// Register an actuator and attach it to every existing rule whose
    /// action text it can handle.
    #[tracing::instrument(skip(self), fields(action = %spec.key()))]
    pub fn register_action(&mut self, spec: ActionSpec) -> Arc<Action<G>> {
        let action = self.context.new_action(spec);
        let action = self.context.actions.register(action);
        for rule in self.context.rules.get_all() {
            if action.can_handle(&rule.parsed().action) {
                rule.attach_action(Arc::clone(&action) as Arc<dyn Observer<RuleTrigger>>);
            }
        }
        action
    }

    /// Parse `text`, bind it to its events and actions, and activate it.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Parse`] for a malformed sentence,
    /// [`RuleEngineError::UnresolvedEvent`] when a clause names no known
    /// event, or [`RuleEngineError::Lookup`] when the description lookup
    /// fails. Nothing is registered on error.
    #[tracing::instrument(skip(self))]
    pub async fn create_rule(&mut self, text: &str) -> Result<RuleId, RuleEngineError> {
        self.create(text, true).await
    }

    /// Remove a rule and detach it from its events and actions.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::NotFound`] when no rule has `id`.
    #[tracing::instrument(skip(self))]
    pub fn delete_rule(&mut self, id: RuleId) -> Result<(), RuleEngineError> {
        let rule = self
            .context
            .rules
            .unregister(&id.to_string())
            .ok_or_else(|| rule_not_found(id))?;
        rule.deactivate();
        rule.detach_all_actions();
        tracing::info!(rule_id = %id, "rule deleted");
        Ok(())
    }

    /// Activate or deactivate a rule. Deactivation is reversible.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::NotFound`] when no rule has `id`.
    #[tracing::instrument(skip(self))]
    pub fn set_active(&mut self, id: RuleId, active: bool) -> Result<(), RuleEngineError> {
        let rule = self
            .context
            .rules
            .get(&id.to_string())
            .ok_or_else(|| rule_not_found(id))?;
        if active {
            rule.activate();
        } else {
            rule.deactivate();
        }
        Ok(())
    }

    /// Push a reading into the named event; watching rules are evaluated
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::NotFound`] for an unknown event or
    /// [`RuleEngineError::EventValue`] when the reading has the wrong shape.
    #[tracing::instrument(skip(self))]
    pub fn update_event_value(&self, name: &str, value: Value) -> Result<(), RuleEngineError> {
        let event = self.event(name)?;
        event.update(&value)?;
        Ok(())
    }

    /// Feed a detector signal into the named anomaly event.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::NotFound`] for an unknown event or
    /// [`RuleEngineError::EventValue`] when it is not an anomaly event.
    #[tracing::instrument(skip(self, reading))]
    pub fn update_anomaly_state(
        &self,
        name: &str,
        detected: bool,
        reading: AnomalyReading,
    ) -> Result<Transition, RuleEngineError> {
        let event = self.event(name)?;
        Ok(event.update_anomaly_state(detected, reading)?)
    }

    /// Replace every rule with the authoritative list.
    ///
    /// Existing rules are deactivated, detached and dropped first. One
    /// result per record is returned, in order; a failing record does not
    /// stop the others.
    #[tracing::instrument(skip(self, records), fields(count = records.len()))]
    pub async fn reload_all(&mut self, records: Vec<RuleRecord>) -> Vec<Result<RuleId, RuleEngineError>> {
        self.clear_rules();

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let result = self.create(&record.text, record.active).await;
            if let Err(err) = &result {
                tracing::warn!(text = %record.text, error = %err, "rule record rejected");
            }
            results.push(result);
        }
        results
    }

    /// Deactivate, detach and drop every rule. Returns how many were
    /// removed.
    #[tracing::instrument(skip(self))]
    pub fn clear_rules(&mut self) -> usize {
        let rules = self.context.rules.get_all();
        for rule in &rules {
            rule.deactivate();
            rule.detach_all_actions();
        }
        self.context.rules.clear();
        rules.len()
    }

    #[must_use]
    pub fn list_events(&self) -> Vec<EventSnapshot> {
        self.context.events.get_all().iter().map(|e| e.snapshot()).collect()
    }

    #[must_use]
    pub fn list_actions(&self) -> Vec<ActionSnapshot> {
        self.context.actions.get_all().iter().map(|a| a.snapshot()).collect()
    }

    #[must_use]
    pub fn list_rules(&self) -> Vec<RuleSnapshot> {
        self.context.rules.get_all().iter().map(|r| r.snapshot()).collect()
    }

    async fn create(&mut self, text: &str, active: bool) -> Result<RuleId, RuleEngineError> {
        let parsed = parse_rule(text)?;
        let resolved = self.resolve_events(&parsed).await?;

        let mut bindings = Vec::with_capacity(resolved.len());
        for (event, description) in resolved {
            if let Some(description) = description {
                event.bind_description(&description);
            }
            bindings.push(event);
        }

        let id = RuleId::new();
        let rule = Arc::new(Rule::new(id, text, parsed, bindings, self.context.clock()));
        let rule = self.context.rules.register(rule);
        if active {
            rule.activate();
        }

        let attached = self.attach_actions(&rule);
        if attached == 0 {
            tracing::warn!(rule_id = %id, action = %rule.parsed().action, "no actuator handles this action");
        }
        tracing::info!(rule_id = %id, rule = %rule.parsed(), active, actions = attached, "rule created");
        Ok(id)
    }

    /// Resolve every clause to a registered event, falling back to the
    /// description lookup. Returns the description used, if any.
    async fn resolve_events(
        &self,
        parsed: &ParsedRule,
    ) -> Result<Vec<(Arc<Event>, Option<String>)>, RuleEngineError> {
        let space_id = self.context.config().space_id.as_deref();
        let mut resolved = Vec::with_capacity(parsed.clauses.len());
        for clause in &parsed.clauses {
            if let Some(event) = self.context.events.get(&clause.event) {
                resolved.push((event, None));
                continue;
            }
            let canonical = self
                .lookup
                .resolve_description(&clause.event, space_id)
                .await
                .map_err(RuleEngineError::Lookup)?;
            let event = canonical
                .and_then(|name| self.context.events.get(&normalize_name(&name)))
                .ok_or_else(|| UnresolvedEventError {
                    name: clause.event.clone(),
                })?;
            tracing::debug!(description = %clause.event, event = %event.name(), "clause resolved through description");
            resolved.push((event, Some(clause.event.clone())));
        }
        Ok(resolved)
    }

    fn attach_actions(&self, rule: &Rule) -> usize {
        let action_text = &rule.parsed().action;
        let mut attached = 0;
        for action in self.context.actions.get_all() {
            if action.can_handle(action_text) {
                rule.attach_action(action as Arc<dyn Observer<RuleTrigger>>);
                attached += 1;
            }
        }
        attached
    }

    fn event(&self, name: &str) -> Result<Arc<Event>, RuleEngineError> {
        let key = normalize_name(name);
        self.context.events.get(&key).ok_or_else(|| {
            NotFoundError {
                entity: "Event",
                id: key,
            }
            .into()
        })
    }
}

fn rule_not_found(id: RuleId) -> RuleEngineError {
    NotFoundError {
        entity: "Rule",
        id: id.to_string(),
    }
    .into()
}
