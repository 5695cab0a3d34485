//! Rule grammar — `if <condition> then <action>` sentences.
//!
//! A sentence is tokenized, then parsed into a [`ParsedRule`]: an ordered
//! list of [`Clause`]s, the single [`JoinOp`] combining them, and the raw
//! action text. The action text is not interpreted here; each actuator kind
//! owns its own micro-grammar (see [`crate::action`]).

mod clause;
mod parser;
mod token;

pub use clause::{Clause, JoinOp};
pub use parser::{parse, parse_rule};
pub use token::{Token, render, tokenize};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured form of a rule sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRule {
    pub clauses: Vec<Clause>,
    pub join: JoinOp,
    /// Action segment as written, minus surrounding whitespace and `,;.`.
    pub action: String,
}

impl ParsedRule {
    /// Canonical text of the condition segment, e.g.
    /// `living room temperature > 25 and motion == true`.
    #[must_use]
    pub fn condition_text(&self) -> String {
        let separator = format!(" {} ", self.join);
        self.clauses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(&separator)
    }

    /// Distinct event names referenced by the condition, in clause order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            if !names.contains(&clause.event.as_str()) {
                names.push(&clause.event);
            }
        }
        names
    }
}

impl fmt::Display for ParsedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if {} then {}", self.condition_text(), self.action)
    }
}

/// Why a rule sentence was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("rule sentence is empty")]
    Empty,

    #[error("unexpected character `{character}` at position {position}")]
    UnexpectedCharacter { character: char, position: usize },

    #[error("rule must start with `if`")]
    MissingIf,

    #[error("missing `then` between condition and action")]
    MissingThen,

    #[error("condition is empty")]
    EmptyCondition,

    #[error("action is empty")]
    EmptyAction,

    #[error("cannot mix `and` and `or` in one condition")]
    MixedJoin,

    #[error("clause {index} is empty")]
    EmptyClause { index: usize },

    #[error("clause `{clause}` has no comparison operator")]
    MissingOperator { clause: String },

    #[error("clause for `{event}` has no comparison value")]
    MissingValue { event: String },

    #[error("clause `{clause}` does not name an event")]
    MissingEventName { clause: String },

    #[error("unexpected `{token}` in clause `{clause}`")]
    UnexpectedToken { token: String, clause: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{CompareOp, Value};

    #[test]
    fn should_render_canonical_sentence() {
        let rule = ParsedRule {
            clauses: vec![
                Clause {
                    event: "living room temperature".to_string(),
                    op: CompareOp::Gt,
                    literal: Value::Number(25.0),
                },
                Clause {
                    event: "living room motion".to_string(),
                    op: CompareOp::Eq,
                    literal: Value::Bool(true),
                },
            ],
            join: JoinOp::And,
            action: "living room ac on 21 cool".to_string(),
        };
        assert_eq!(
            rule.to_string(),
            "if living room temperature > 25 and living room motion == true then living room ac on 21 cool"
        );
    }

    #[test]
    fn should_list_each_event_name_once() {
        let rule = parse_rule("if a > 1 or a < -1 or b == true then hall light on").unwrap();
        assert_eq!(rule.event_names(), vec!["a", "b"]);
    }
}
