//! Anomaly description lookup port.
//!
//! Rule authors may name an anomaly by a free-text description instead of
//! its machine-generated event name. The engine asks this port to map the
//! description back to a canonical event name.

use std::error::Error;
use std::future::Future;

/// Boxed error from a lookup backend.
pub type LookupError = Box<dyn Error + Send + Sync>;

/// Resolves human descriptions to canonical anomaly event names.
pub trait AnomalyDescriptionLookup: Send + Sync {
    /// Return the canonical event name for `text`, or `None` if unknown.
    ///
    /// `space_id` scopes the lookup to one site when the backend serves
    /// several.
    fn resolve_description(
        &self,
        text: &str,
        space_id: Option<&str>,
    ) -> impl Future<Output = Result<Option<String>, LookupError>> + Send;
}

/// Lookup that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDescriptions;

impl AnomalyDescriptionLookup for NoDescriptions {
    async fn resolve_description(
        &self,
        _text: &str,
        _space_id: Option<&str>,
    ) -> Result<Option<String>, LookupError> {
        Ok(None)
    }
}
