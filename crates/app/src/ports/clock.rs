//! Clock port — the single source of "now" for transitions, dispatches and
//! intents.

use std::sync::Arc;

use homerule_domain::time::{self, Timestamp};

/// Supplies the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        time::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_read_system_time() {
        let before = time::now();
        let ts = SystemClock.now();
        assert!(ts >= before);
    }

    #[test]
    fn should_read_through_shared_handle() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let before = time::now();
        assert!(clock.now() >= before);
    }
}
