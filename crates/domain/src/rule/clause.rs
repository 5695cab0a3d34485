//! Condition clauses and the operator that joins them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{CompareOp, EvaluationTypeError, Value};

/// A single `<event> <operator> <literal>` comparison.
///
/// `<event> detected` / `<event> not detected` are stored as `== true` /
/// `== false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    /// Normalized event name (lowercase, single spaces).
    pub event: String,
    pub op: CompareOp,
    pub literal: Value,
}

impl Clause {
    /// Compare the event's current value against the literal.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationTypeError`] when the two sides have no common
    /// type for the operator.
    pub fn evaluate(&self, actual: &Value) -> Result<bool, EvaluationTypeError> {
        self.op.apply(actual, &self.literal)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.event, self.op, self.literal)
    }
}

/// How the clauses of one rule combine. A rule never mixes the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinOp {
    And,
    Or,
    /// Single-clause rule.
    #[default]
    None,
}

impl JoinOp {
    /// Fold per-clause results.
    #[must_use]
    pub fn fold(self, results: &[bool]) -> bool {
        match self {
            Self::And | Self::None => !results.is_empty() && results.iter().all(|r| *r),
            Self::Or => results.iter().any(|r| *r),
        }
    }

    pub(crate) fn from_keyword(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("and") {
            Some(Self::And)
        } else if word.eq_ignore_ascii_case("or") {
            Some(Self::Or)
        } else {
            None
        }
    }
}

impl fmt::Display for JoinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
            Self::None => f.write_str("none"),
        }
    }
}
