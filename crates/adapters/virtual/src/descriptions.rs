//! Static anomaly description table.

use std::collections::HashMap;

use homerule_app::ports::{AnomalyDescriptionLookup, LookupError};
use homerule_domain::event::normalize_name;

/// Maps free-text anomaly descriptions to canonical event names.
///
/// Descriptions are matched after normalization (lowercase, single
/// spaces). An entry registered without a space answers every space; a
/// space-scoped entry takes precedence over it.
#[derive(Debug, Clone, Default)]
pub struct StaticDescriptions {
    entries: HashMap<(Option<String>, String), String>,
}

impl StaticDescriptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `description` for every space.
    #[must_use]
    pub fn with(mut self, description: &str, event: &str) -> Self {
        self.insert(None, description, event);
        self
    }

    /// Register `description` for a single space.
    #[must_use]
    pub fn with_in_space(mut self, space_id: &str, description: &str, event: &str) -> Self {
        self.insert(Some(space_id), description, event);
        self
    }

    pub fn insert(&mut self, space_id: Option<&str>, description: &str, event: &str) {
        self.entries.insert(
            (space_id.map(str::to_string), normalize_name(description)),
            normalize_name(event),
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AnomalyDescriptionLookup for StaticDescriptions {
    async fn resolve_description(
        &self,
        text: &str,
        space_id: Option<&str>,
    ) -> Result<Option<String>, LookupError> {
        let description = normalize_name(text);
        let scoped = space_id
            .and_then(|space| {
                self.entries
                    .get(&(Some(space.to_string()), description.clone()))
            })
            .or_else(|| self.entries.get(&(None, description)));
        tracing::debug!(text, ?space_id, resolved = ?scoped, "description lookup");
        Ok(scoped.cloned())
    }
}
