//! Registries — canonical, deduplicated stores of events, actions and rules.

use std::sync::Arc;

use homerule_domain::action::ActionKind;
use homerule_domain::event::{EventKind, normalize_name};
use homerule_domain::rule::JoinOp;

use crate::action::Action;
use crate::event::Event;
use crate::ports::DeviceGateway;
use crate::rule::Rule;

/// Something a [`Registry`] can hold.
pub trait Registrable {
    type Kind: Copy + PartialEq;

    /// Identity key; two items with the same key are the same item.
    fn registry_key(&self) -> String;

    fn kind(&self) -> Self::Kind;

    /// Whether the item lives at `location` (already normalized).
    fn is_at(&self, location: &str) -> bool;
}

/// Insertion-ordered store keyed by [`Registrable::registry_key`].
///
/// Mutated only from the engine's reactor context, so it needs no locking.
#[derive(Debug)]
pub struct Registry<T> {
    items: Vec<Arc<T>>,
}

impl<T: Registrable> Registry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Store `item`, or return the already registered item with the same
    /// key.
    pub fn register(&mut self, item: Arc<T>) -> Arc<T> {
        let key = item.registry_key();
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        self.items.push(Arc::clone(&item));
        item
    }

    pub fn unregister(&mut self, key: &str) -> Option<Arc<T>> {
        let index = self.items.iter().position(|i| i.registry_key() == key)?;
        Some(self.items.remove(index))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.items.iter().find(|i| i.registry_key() == key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|i| i.registry_key() == key)
    }

    #[must_use]
    pub fn get_all(&self) -> Vec<Arc<T>> {
        self.items.clone()
    }

    #[must_use]
    pub fn get_by_type(&self, kind: T::Kind) -> Vec<Arc<T>> {
        self.items.iter().filter(|i| i.kind() == kind).cloned().collect()
    }

    #[must_use]
    pub fn get_by_location(&self, location: &str) -> Vec<Arc<T>> {
        let location = normalize_name(location);
        self.items.iter().filter(|i| i.is_at(&location)).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Registrable> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Registrable for Event {
    type Kind = EventKind;

    fn registry_key(&self) -> String {
        self.name().to_string()
    }

    fn kind(&self) -> EventKind {
        Event::kind(self)
    }

    fn is_at(&self, location: &str) -> bool {
        self.location() == location
    }
}

impl<G: DeviceGateway> Registrable for Action<G> {
    type Kind = ActionKind;

    fn registry_key(&self) -> String {
        self.key().to_string()
    }

    fn kind(&self) -> ActionKind {
        Action::kind(self)
    }

    fn is_at(&self, location: &str) -> bool {
        self.location() == location
    }
}

/// Rules are typed by how their clauses combine, and located wherever one
/// of their events is.
impl Registrable for Rule {
    type Kind = JoinOp;

    fn registry_key(&self) -> String {
        self.id().to_string()
    }

    fn kind(&self) -> JoinOp {
        self.parsed().join
    }

    fn is_at(&self, location: &str) -> bool {
        self.events().iter().any(|e| e.location() == location)
    }
}

#[cfg(test)]
mod tests {
    use homerule_domain::event::EventSpec;

    use super::*;
    use crate::ports::{AnomalyAlert, AnomalyNotifier, SystemClock};

    struct Silent;

    impl AnomalyNotifier for Silent {
        fn anomaly_raised(&self, _alert: &AnomalyAlert) {}
    }

    fn event(name: &str, kind: EventKind, location: &str) -> Arc<Event> {
        let spec = EventSpec::new(name, kind, location).unwrap();
        Arc::new(Event::new(spec, Arc::new(SystemClock), Arc::new(Silent)))
    }

    #[test]
    fn should_return_existing_item_when_key_is_registered_twice() {
        let mut registry = Registry::new();
        let first = registry.register(event("kitchen temperature", EventKind::Temperature, "kitchen"));
        let second = registry.register(event("Kitchen Temperature", EventKind::Temperature, "kitchen"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_filter_by_type_and_location() {
        let mut registry = Registry::new();
        registry.register(event("kitchen temperature", EventKind::Temperature, "kitchen"));
        registry.register(event("kitchen motion", EventKind::Motion, "kitchen"));
        registry.register(event("hall motion", EventKind::Motion, "hall"));

        assert_eq!(registry.get_by_type(EventKind::Motion).len(), 2);
        let kitchen: Vec<String> = registry
            .get_by_location("Kitchen")
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(kitchen, vec!["kitchen temperature", "kitchen motion"]);
    }

    #[test]
    fn should_unregister_and_clear() {
        let mut registry = Registry::new();
        registry.register(event("a", EventKind::Motion, "hall"));
        registry.register(event("b", EventKind::Motion, "hall"));

        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
        assert!(!registry.contains("a"));
        registry.clear();
        assert!(registry.is_empty());
    }
}
