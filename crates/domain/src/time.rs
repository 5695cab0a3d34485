//! Timestamps and cooldown windows.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for transitions, dispatches and intents.
pub type Timestamp = DateTime<Utc>;

#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Whether less than `window` has elapsed between `since` and `now`.
///
/// A `since` in the future counts as inside the window.
#[must_use]
pub fn within_window(since: Timestamp, now: Timestamp, window: Duration) -> bool {
    match now.signed_duration_since(since).to_std() {
        Ok(elapsed) => elapsed < window,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    #[test]
    fn should_be_inside_window_before_it_elapses() {
        let since = now();
        assert!(within_window(since, since + TimeDelta::seconds(9), WINDOW));
    }

    #[test]
    fn should_be_outside_window_once_it_elapses() {
        let since = now();
        assert!(!within_window(since, since + TimeDelta::seconds(10), WINDOW));
    }

    #[test]
    fn should_treat_future_timestamp_as_inside_window() {
        let at = now();
        assert!(within_window(at + TimeDelta::seconds(5), at, Duration::from_secs(1)));
    }

    #[test]
    fn should_close_zero_window_immediately() {
        let at = now();
        assert!(!within_window(at, at, Duration::ZERO));
    }
}
