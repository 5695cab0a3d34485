//! Engine context — the explicitly constructed home of the three
//! registries and the dispatch machinery.

use std::sync::Arc;
use std::time::Duration;

use homerule_domain::action::ActionSpec;
use homerule_domain::event::EventSpec;

use crate::action::{Action, ActionDeps};
use crate::arbiter::IntentArbiter;
use crate::dispatch::DispatchQueue;
use crate::event::Event;
use crate::ports::{AnomalyNotifier, Clock, DeviceGateway};
use crate::registry::Registry;
use crate::rule::Rule;

/// Timing and scoping knobs of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// A different climate intent inside this window is suppressed.
    pub conflict_cooldown: Duration,
    /// The same climate intent inside this window is suppressed.
    pub repeat_cooldown: Duration,
    /// An identical notification may be sent again after this long.
    pub notification_resend: Duration,
    /// Scope passed to the anomaly description lookup.
    pub space_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conflict_cooldown: Duration::from_secs(10),
            repeat_cooldown: Duration::from_secs(2),
            notification_resend: Duration::from_secs(300),
            space_id: None,
        }
    }
}

/// Registries plus everything an event or action needs at construction.
pub struct EngineContext<G> {
    pub events: Registry<Event>,
    pub actions: Registry<Action<G>>,
    pub rules: Registry<Rule>,
    deps: ActionDeps<G>,
    notifier: Arc<dyn AnomalyNotifier>,
}

impl<G: DeviceGateway> EngineContext<G> {
    #[must_use]
    pub fn new(
        gateway: Arc<G>,
        queue: DispatchQueue,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn AnomalyNotifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            events: Registry::new(),
            actions: Registry::new(),
            rules: Registry::new(),
            deps: ActionDeps {
                gateway,
                queue,
                arbiter: IntentArbiter::new(),
                clock,
                config,
            },
            notifier,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.deps.config
    }

    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.deps.clock)
    }

    #[must_use]
    pub fn queue(&self) -> &DispatchQueue {
        &self.deps.queue
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<G> {
        &self.deps.gateway
    }

    /// Build a live event wired to this context's clock and notifier. The
    /// event is not registered.
    #[must_use]
    pub fn new_event(&self, spec: EventSpec) -> Arc<Event> {
        Arc::new(Event::new(spec, self.clock(), Arc::clone(&self.notifier)))
    }

    /// Build a live action sharing this context's gateway, queue and
    /// arbiter. The action is not registered.
    #[must_use]
    pub fn new_action(&self, spec: ActionSpec) -> Arc<Action<G>> {
        Arc::new(Action::new(spec, self.deps.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_documented_windows() {
        let config = EngineConfig::default();
        assert_eq!(config.conflict_cooldown, Duration::from_secs(10));
        assert_eq!(config.repeat_cooldown, Duration::from_secs(2));
        assert_eq!(config.notification_resend, Duration::from_secs(300));
        assert!(config.space_id.is_none());
    }
}
