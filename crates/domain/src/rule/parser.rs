//! Parser — turns a rule sentence or token stream into a [`ParsedRule`].

use crate::event::normalize_name;
use crate::value::{CompareOp, Value};

use super::clause::{Clause, JoinOp};
use super::token::{Token, find_keyword, render, tokenize};
use super::{ParseError, ParsedRule};

/// Tokenize and parse a rule sentence in one step.
///
/// Only the text up to the first `then` is tokenized. The action segment is
/// taken verbatim from the sentence, minus surrounding whitespace and
/// `,;.` punctuation.
///
/// # Errors
///
/// Returns [`ParseError`] when the sentence is not a well-formed
/// `if <condition> then <action>` rule.
pub fn parse_rule(text: &str) -> Result<ParsedRule, ParseError> {
    let Some(then) = find_keyword(text, "then") else {
        return parse(&tokenize(text)?);
    };
    let head = tokenize(&text[..then.end])?;
    let action = text[then.end..]
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.'));
    parse_segments(&head, action)
}

/// Parse a fully tokenized sentence.
///
/// Punctuation inside the condition segment is ignored; leading and
/// trailing punctuation around the action segment is dropped.
///
/// # Errors
///
/// Returns [`ParseError`] when the `if … then …` shape is missing, a clause
/// lacks an operator or value, or `and` and `or` are mixed.
pub fn parse(tokens: &[Token]) -> Result<ParsedRule, ParseError> {
    let then_at = tokens.iter().position(|t| t.is_keyword("then"));
    let head_len = then_at.map_or(tokens.len(), |at| at + 1);
    let action = render(trim_punctuation(&tokens[head_len..]));
    parse_segments(&tokens[..head_len], &action)
}

/// `head` runs from `if` through the first `then` (if any).
fn parse_segments(head: &[Token], action: &str) -> Result<ParsedRule, ParseError> {
    let (first, rest) = head.split_first().ok_or(ParseError::Empty)?;
    if !first.is_keyword("if") {
        return Err(ParseError::MissingIf);
    }
    let then_at = rest
        .iter()
        .position(|t| t.is_keyword("then"))
        .ok_or(ParseError::MissingThen)?;

    let condition: Vec<&Token> = rest[..then_at]
        .iter()
        .filter(|t| !matches!(t, Token::Punct(_)))
        .collect();
    if condition.is_empty() {
        return Err(ParseError::EmptyCondition);
    }
    if action.is_empty() {
        return Err(ParseError::EmptyAction);
    }

    let (segments, join) = split_on_join(&condition)?;
    let clauses = segments
        .iter()
        .enumerate()
        .map(|(index, segment)| parse_clause(index, segment))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedRule {
        clauses,
        join,
        action: action.to_string(),
    })
}

fn trim_punctuation(tokens: &[Token]) -> &[Token] {
    let is_trimmable = |t: &Token| matches!(t, Token::Punct(',' | ';' | '.'));
    let start = tokens.iter().position(|t| !is_trimmable(t)).unwrap_or(tokens.len());
    let end = tokens.iter().rposition(|t| !is_trimmable(t)).map_or(start, |i| i + 1);
    &tokens[start..end]
}

/// Split the condition on its join keyword. Every keyword consumed opens
/// exactly one new segment, so `segments.len() - 1` equals the number of
/// joins.
fn split_on_join<'a>(tokens: &[&'a Token]) -> Result<(Vec<Vec<&'a Token>>, JoinOp), ParseError> {
    let mut join = JoinOp::None;
    let mut segments: Vec<Vec<&Token>> = vec![Vec::new()];

    for &token in tokens {
        if let Some(keyword) = token.as_word().and_then(JoinOp::from_keyword) {
            if join != JoinOp::None && join != keyword {
                return Err(ParseError::MixedJoin);
            }
            join = keyword;
            segments.push(Vec::new());
        } else if let Some(segment) = segments.last_mut() {
            segment.push(token);
        }
    }

    if let Some(index) = segments.iter().position(Vec::is_empty) {
        return Err(ParseError::EmptyClause { index });
    }
    Ok((segments, join))
}

fn parse_clause(index: usize, segment: &[&Token]) -> Result<Clause, ParseError> {
    let clause_text = || {
        let owned: Vec<Token> = segment.iter().map(|t| (*t).clone()).collect();
        render(&owned)
    };

    let operator = segment.iter().enumerate().find_map(|(at, t)| match t {
        Token::Operator(op) => Some((at, *op)),
        Token::Word(_) | Token::Punct(_) => None,
    });

    if let Some((at, op)) = operator {
        let event = event_name(&segment[..at]).ok_or_else(|| ParseError::MissingEventName {
            clause: clause_text(),
        })?;
        let value = &segment[at + 1..];
        if value.is_empty() {
            return Err(ParseError::MissingValue { event });
        }
        if let Some(extra) = value.iter().find(|t| t.as_word().is_none()) {
            return Err(ParseError::UnexpectedToken {
                token: extra.to_string(),
                clause: clause_text(),
            });
        }
        let words: Vec<&str> = value.iter().filter_map(|t| t.as_word()).collect();
        let literal = match words.as_slice() {
            [single] => Value::parse_literal(single),
            many => Value::Text(many.join(" ")),
        };
        return Ok(Clause { event, op, literal });
    }

    if segment.is_empty() {
        return Err(ParseError::EmptyClause { index });
    }
    if !segment.last().is_some_and(|t| t.is_keyword("detected")) {
        return Err(ParseError::MissingOperator {
            clause: clause_text(),
        });
    }
    let negated = segment.len() >= 2 && segment[segment.len() - 2].is_keyword("not");
    let name_len = segment.len() - if negated { 2 } else { 1 };
    let event = event_name(&segment[..name_len]).ok_or_else(|| ParseError::MissingEventName {
        clause: clause_text(),
    })?;

    Ok(Clause {
        event,
        op: CompareOp::Eq,
        literal: Value::Bool(!negated),
    })
}

fn event_name(tokens: &[&Token]) -> Option<String> {
    let words: Vec<&str> = tokens.iter().filter_map(|t| t.as_word()).collect();
    if words.is_empty() || words.len() != tokens.len() {
        return None;
    }
    Some(normalize_name(&words.join(" ")))
}
