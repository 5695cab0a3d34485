//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RuleEngineError`] via `#[from]`. Errors that describe a single
//! concern (grammar, values, commands) live next to the type they guard.

use crate::event::EventValueError;
use crate::rule::ParseError;

/// Umbrella error returned by rule-management use-cases.
#[derive(Debug, thiserror::Error)]
pub enum RuleEngineError {
    /// The rule sentence could not be parsed.
    #[error("invalid rule sentence")]
    Parse(#[from] ParseError),

    /// A condition references an event that does not exist.
    #[error("unresolved event")]
    UnresolvedEvent(#[from] UnresolvedEventError),

    /// The requested item does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A reading does not fit the event it was pushed to.
    #[error("invalid event value")]
    EventValue(#[from] EventValueError),

    /// The external anomaly description lookup failed.
    #[error("anomaly description lookup failed")]
    Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("location must not be empty")]
    EmptyLocation,
}

/// A lookup by identity key found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A condition clause names an event that neither matches a registered
/// event nor resolves through an anomaly description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no event matches `{name}`")]
pub struct UnresolvedEventError {
    pub name: String,
}
