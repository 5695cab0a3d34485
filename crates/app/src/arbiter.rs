//! Conflict arbiter — one last-intent record per actuator class.
//!
//! Several rules may drive the same climate unit with opposite intents. The
//! arbiter serializes dispatches per class and suppresses an intent that
//! conflicts with, or repeats, a very recent one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use homerule_domain::action::ActionKind;
use homerule_domain::time::{Timestamp, within_window};

/// Last intent accepted for an actuator class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastIntent {
    pub intent: String,
    pub at: Timestamp,
}

/// Why a dispatch was held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    /// A different intent was accepted inside the conflict window.
    ConflictingIntent,
    /// The same intent was accepted inside the repeat window.
    RateLimited,
}

impl std::fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConflictingIntent => f.write_str("conflicting recent intent"),
            Self::RateLimited => f.write_str("rate limited"),
        }
    }
}

type Slot = Arc<AsyncMutex<Option<LastIntent>>>;

/// Keyed async mutex over the last-intent records.
///
/// Records are keyed by [`ActionKind`] alone, not by location: every climate
/// unit in the home shares one record. Two rooms' AC rules firing from the
/// same reading therefore throttle each other, and a bedroom `on 22` right
/// after a living-room `on 22` is rate limited. Intents carry no location
/// (see [`Command::intent`](homerule_domain::action::Command::intent)).
#[derive(Debug, Clone, Default)]
pub struct IntentArbiter {
    slots: Arc<Mutex<HashMap<ActionKind, Slot>>>,
}

impl IntentArbiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take exclusive hold of the record for `kind`. The hold lasts until
    /// the returned guard is dropped, so check and record are atomic.
    pub async fn acquire(&self, kind: ActionKind) -> IntentGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(kind).or_default())
        };
        IntentGuard(slot.lock_owned().await)
    }
}

/// Exclusive hold on one class's last-intent record.
pub struct IntentGuard(OwnedMutexGuard<Option<LastIntent>>);

impl IntentGuard {
    /// Decide whether `intent` may go out at `now`.
    #[must_use]
    pub fn check(
        &self,
        intent: &str,
        now: Timestamp,
        conflict_window: Duration,
        repeat_window: Duration,
    ) -> Option<SuppressionReason> {
        let last = self.0.as_ref()?;
        if last.intent == intent {
            within_window(last.at, now, repeat_window).then_some(SuppressionReason::RateLimited)
        } else {
            within_window(last.at, now, conflict_window)
                .then_some(SuppressionReason::ConflictingIntent)
        }
    }

    /// Record an accepted intent.
    pub fn record(&mut self, intent: String, at: Timestamp) {
        *self.0 = Some(LastIntent { intent, at });
    }

    #[must_use]
    pub fn last(&self) -> Option<&LastIntent> {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    const CONFLICT: Duration = Duration::from_secs(10);
    const REPEAT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn should_allow_first_intent() {
        let arbiter = IntentArbiter::new();
        let guard = arbiter.acquire(ActionKind::Climate).await;
        assert_eq!(guard.check("on", homerule_domain::time::now(), CONFLICT, REPEAT), None);
    }

    #[tokio::test]
    async fn should_suppress_conflicting_intent_inside_window() {
        let arbiter = IntentArbiter::new();
        let t0 = homerule_domain::time::now();
        arbiter.acquire(ActionKind::Climate).await.record("on".into(), t0);

        let guard = arbiter.acquire(ActionKind::Climate).await;
        assert_eq!(
            guard.check("off", t0 + TimeDelta::seconds(5), CONFLICT, REPEAT),
            Some(SuppressionReason::ConflictingIntent)
        );
        assert_eq!(guard.check("off", t0 + TimeDelta::seconds(11), CONFLICT, REPEAT), None);
    }

    #[tokio::test]
    async fn should_rate_limit_same_intent_inside_repeat_window() {
        let arbiter = IntentArbiter::new();
        let t0 = homerule_domain::time::now();
        arbiter.acquire(ActionKind::Climate).await.record("on 21".into(), t0);

        let guard = arbiter.acquire(ActionKind::Climate).await;
        assert_eq!(
            guard.check("on 21", t0 + TimeDelta::seconds(1), CONFLICT, REPEAT),
            Some(SuppressionReason::RateLimited)
        );
        assert_eq!(guard.check("on 21", t0 + TimeDelta::seconds(3), CONFLICT, REPEAT), None);
    }

    #[tokio::test]
    async fn should_keep_classes_independent() {
        let arbiter = IntentArbiter::new();
        let t0 = homerule_domain::time::now();
        arbiter.acquire(ActionKind::Climate).await.record("on".into(), t0);

        let guard = arbiter.acquire(ActionKind::Light).await;
        assert!(guard.last().is_none());
    }

    #[tokio::test]
    async fn should_serialize_holders_of_same_class() {
        let arbiter = IntentArbiter::new();
        let first = arbiter.acquire(ActionKind::Climate).await;

        let contender = arbiter.clone();
        let waiting = tokio::spawn(async move {
            contender.acquire(ActionKind::Climate).await.last().cloned()
        });
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        let mut first = first;
        first.record("off".into(), homerule_domain::time::now());
        drop(first);

        let seen = waiting.await.unwrap();
        assert_eq!(seen.map(|l| l.intent), Some("off".to_string()));
    }
}
