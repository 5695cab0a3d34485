//! Observer plumbing shared by events (observed by rules) and rules
//! (observed by actions).

use std::sync::{Arc, Mutex, PoisonError};

/// Something that reacts when a subject notifies it.
pub trait Observer<T: ?Sized>: Send + Sync {
    /// Identity used to make subscription idempotent.
    fn observer_key(&self) -> String;

    /// React to `subject`. Must not block.
    fn notify(self: Arc<Self>, subject: &T);
}

/// An ordered, deduplicated set of observers.
///
/// Observers are notified in subscription order. The set is snapshotted
/// before notifying, so an observer may subscribe or unsubscribe others
/// from inside `notify`.
pub struct Observable<T: ?Sized> {
    observers: Mutex<Vec<Arc<dyn Observer<T>>>>,
}

impl<T: ?Sized> Observable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Add `observer`; returns `false` if one with the same key is already
    /// subscribed.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> bool {
        let mut observers = self.lock();
        let key = observer.observer_key();
        if observers.iter().any(|o| o.observer_key() == key) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Remove the observer with `key`; returns `false` if it was absent.
    pub fn unsubscribe(&self, key: &str) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|o| o.observer_key() != key);
        observers.len() != before
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().iter().any(|o| o.observer_key() == key)
    }

    /// Keys of the current observers, in subscription order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().map(|o| o.observer_key()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Notify every observer, synchronously and in subscription order.
    pub fn notify(&self, subject: &T) {
        let snapshot: Vec<_> = self.lock().clone();
        for observer in snapshot {
            observer.notify(subject);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn Observer<T>>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ?Sized> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("observers", &self.keys())
            .finish()
    }
}
