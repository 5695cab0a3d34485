//! Live action — one actuator with its idempotency cache.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use homerule_domain::action::{ActionKind, ActionSpec, Command, DispatchedState};
use homerule_domain::time::{Timestamp, within_window};

use crate::arbiter::IntentArbiter;
use crate::context::EngineConfig;
use crate::dispatch::{DispatchError, DispatchOutcome, DispatchQueue, DispatchReport};
use crate::observer::Observer;
use crate::ports::{Clock, DeviceGateway, GatewayError};
use crate::rule::RuleTrigger;

/// Read-only view of an [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSnapshot {
    pub key: String,
    pub kind: ActionKind,
    pub location: String,
    pub target: Option<String>,
    pub last_dispatched: Option<DispatchedState>,
}

/// What an action needs from the engine to dispatch.
pub struct ActionDeps<G> {
    pub gateway: Arc<G>,
    pub queue: DispatchQueue,
    pub arbiter: IntentArbiter,
    pub clock: Arc<dyn Clock>,
    pub config: EngineConfig,
}

impl<G> Clone for ActionDeps<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            queue: self.queue.clone(),
            arbiter: self.arbiter.clone(),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

/// One actuator, observed as the target of rule triggers.
///
/// A trigger is turned into a job on the dispatch queue; the rule never
/// waits for it. Dispatches of one action run one at a time, so the cache
/// is checked and updated atomically. Climate actions additionally hold
/// the class-wide intent record, always taken before the action's own
/// guard.
pub struct Action<G> {
    spec: ActionSpec,
    key: String,
    deps: ActionDeps<G>,
    last: Mutex<Option<DispatchedState>>,
    serial: tokio::sync::Mutex<()>,
}

impl<G: DeviceGateway> Action<G> {
    #[must_use]
    pub fn new(spec: ActionSpec, deps: ActionDeps<G>) -> Self {
        Self {
            key: spec.key(),
            spec,
            deps,
            last: Mutex::new(None),
            serial: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.spec.kind
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.spec.location
    }

    #[must_use]
    pub fn can_handle(&self, action_text: &str) -> bool {
        self.spec.can_handle(action_text)
    }

    /// Last command the gateway accepted.
    #[must_use]
    pub fn last_dispatched(&self) -> Option<DispatchedState> {
        self.lock_last().clone()
    }

    /// Resolve the trigger's action text and send it, unless the cache or
    /// the conflict arbiter says otherwise.
    ///
    /// Failures never touch the cache, so a retry of the same target is
    /// not mistaken for a no-op.
    pub async fn dispatch(&self, trigger: &RuleTrigger) -> DispatchOutcome {
        let command = match self
            .spec
            .parse_command(&trigger.action_text, &trigger.condition_text)
        {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!(action = %self.key, rule_id = %trigger.rule_id, error = %err, "action text not understood");
                return DispatchOutcome::Failed(DispatchError::Command(err));
            }
        };

        let mut intent = if self.spec.kind.has_global_conflict() {
            Some(self.deps.arbiter.acquire(self.spec.kind).await)
        } else {
            None
        };
        let _serial = self.serial.lock().await;

        let now = self.deps.clock.now();
        let last = self.last_dispatched();
        if !self.needs_dispatch(&command, last.as_ref(), now) {
            tracing::debug!(action = %self.key, command = %command, "already in requested state");
            return DispatchOutcome::NoOp;
        }

        let label = command.intent();
        if let Some(guard) = intent.as_ref() {
            let config = &self.deps.config;
            if let Some(reason) = guard.check(&label, now, config.conflict_cooldown, config.repeat_cooldown) {
                tracing::warn!(action = %self.key, rule_id = %trigger.rule_id, intent = %label, %reason, "dispatch suppressed");
                return DispatchOutcome::Suppressed(reason);
            }
        }

        if let Err(err) = self.send(&command).await {
            tracing::error!(action = %self.key, rule_id = %trigger.rule_id, error = %err, "dispatch failed");
            return DispatchOutcome::Failed(DispatchError::Gateway(err));
        }

        let at = self.deps.clock.now();
        let merged = command.merged_over(last.as_ref().map(|s| &s.command));
        *self.lock_last() = Some(DispatchedState { command: merged, at });
        if let Some(guard) = intent.as_mut() {
            guard.record(label, at);
        }
        tracing::info!(action = %self.key, rule_id = %trigger.rule_id, command = %command, "dispatched");
        DispatchOutcome::Dispatched(command)
    }

    #[must_use]
    pub fn snapshot(&self) -> ActionSnapshot {
        ActionSnapshot {
            key: self.key.clone(),
            kind: self.spec.kind,
            location: self.spec.location.clone(),
            target: self.spec.target.clone(),
            last_dispatched: self.last_dispatched(),
        }
    }

    fn needs_dispatch(&self, command: &Command, last: Option<&DispatchedState>, now: Timestamp) -> bool {
        if command.is_relevant_change(last.map(|s| &s.command)) {
            return true;
        }
        self.spec.kind == ActionKind::Notification
            && last.is_some_and(|s| !within_window(s.at, now, self.deps.config.notification_resend))
    }

    async fn send(&self, command: &Command) -> Result<(), GatewayError> {
        let gateway = &self.deps.gateway;
        match command {
            Command::Climate(state) => gateway.set_climate_state(&self.spec.location, state).await,
            Command::Light { on } => gateway.set_light_state(&self.spec.location, *on).await,
            Command::Notification { address, message } => {
                gateway.send_notification(address, message).await
            }
        }
    }

    fn lock_last(&self) -> std::sync::MutexGuard<'_, Option<DispatchedState>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<G: DeviceGateway> Observer<RuleTrigger> for Action<G> {
    fn observer_key(&self) -> String {
        self.key.clone()
    }

    fn notify(self: Arc<Self>, subject: &RuleTrigger) {
        let trigger = subject.clone();
        let queue = self.deps.queue.clone();
        let submitted = queue.submit(async move {
            let outcome = self.dispatch(&trigger).await;
            DispatchReport {
                action: self.key.clone(),
                rule_id: trigger.rule_id,
                outcome,
                at: self.deps.clock.now(),
            }
        });
        if !submitted {
            tracing::error!(rule_id = %subject.rule_id, "dispatch queue is closed, trigger dropped");
        }
    }
}

impl<G> std::fmt::Debug for Action<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("key", &self.key)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}
