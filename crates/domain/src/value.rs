//! Comparison values and the coercion rule shared by every condition.
//!
//! Event readings and clause literals are both lowered to [`Value`]. Before
//! an operator is applied the two sides are coerced to a common type: numeric
//! if both read as numbers, else boolean if both read as booleans, else text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A scalar taking part in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Interpret a literal word as typed in a rule sentence.
    ///
    /// Finite numbers become [`Value::Number`], `true` / `false` become
    /// [`Value::Bool`], anything else stays [`Value::Text`].
    #[must_use]
    pub fn parse_literal(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(n) = raw.parse::<f64>().ok().filter(|n| n.is_finite()) {
            return Self::Number(n);
        }
        match raw.to_ascii_lowercase().as_str() {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Read this value as a number, if it is one or spells one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Self::Bool(_) => None,
        }
    }

    /// Read this value as a boolean, if it is one or spells one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "detected" => Some(true),
                "false" | "off" | "no" => Some(false),
                _ => None,
            },
            Self::Number(_) => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Both sides of a comparison after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Number(f64, f64),
    Bool(bool, bool),
    Text(String, String),
}

/// Coerce two values to a common type.
///
/// Text comparison is case-insensitive, so both sides are lowercased.
#[must_use]
pub fn coerce(left: &Value, right: &Value) -> Coerced {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return Coerced::Number(l, r);
    }
    if let (Some(l), Some(r)) = (left.as_bool(), right.as_bool()) {
        return Coerced::Bool(l, r);
    }
    Coerced::Text(
        left.to_string().to_lowercase(),
        right.to_string().to_lowercase(),
    )
}

/// Comparison operator of a condition clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl CompareOp {
    /// Canonical symbol, as written in a rule sentence.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    /// Whether this operator needs an ordering (only numbers have one).
    #[must_use]
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Lt | Self::Ge | Self::Le)
    }

    /// Coerce both sides and apply the operator.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationTypeError`] when an ordering operator is applied
    /// to values that only coerce to booleans or text.
    pub fn apply(self, left: &Value, right: &Value) -> Result<bool, EvaluationTypeError> {
        match coerce(left, right) {
            Coerced::Number(l, r) => Ok(match self {
                Self::Gt => l > r,
                Self::Lt => l < r,
                Self::Ge => l >= r,
                Self::Le => l <= r,
                Self::Eq => (l - r).abs() < f64::EPSILON,
                Self::Ne => (l - r).abs() >= f64::EPSILON,
            }),
            Coerced::Bool(l, r) if !self.is_ordering() => Ok((l == r) == (self == Self::Eq)),
            Coerced::Text(l, r) if !self.is_ordering() => Ok((l == r) == (self == Self::Eq)),
            Coerced::Bool(..) | Coerced::Text(..) => Err(EvaluationTypeError {
                op: self,
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for CompareOp {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            ">=" => Ok(Self::Ge),
            "<=" => Ok(Self::Le),
            "==" | "=" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            other => Err(UnknownOperator(other.to_string())),
        }
    }
}

/// The string is not a comparison operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown comparison operator `{0}`")]
pub struct UnknownOperator(pub String);

/// A clause compared values that have no common ordered type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operator `{op}` cannot compare {left} with {right}")]
pub struct EvaluationTypeError {
    pub op: CompareOp,
    pub left: &'static str,
    pub right: &'static str,
}
