//! Reading feed — one sensor reading per input line.
//!
//! ```text
//! living room temperature = 27.5
//! hallway motion = on
//! server room overheating detected
//! server room overheating clear
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use homerule_app::ports::{AnomalyDescriptionLookup, DeviceGateway};
use homerule_app::services::RuleManager;
use homerule_domain::error::RuleEngineError;
use homerule_domain::event::{AnomalyReading, normalize_name};
use homerule_domain::value::Value;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Value { event: String, value: Value },
    Anomaly { event: String, detected: bool },
}

/// An input line that is not a reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("expected `<event> = <value>`, `<event> detected` or `<event> clear`")]
    Malformed,
    #[error("reading has no event name")]
    MissingEvent,
    #[error("reading for `{event}` has no value")]
    MissingValue { event: String },
}

/// Parse one input line. Returns `Ok(None)` for blank and comment lines.
///
/// # Errors
///
/// Returns [`FeedError`] when the line is neither an assignment nor an
/// anomaly signal.
pub fn parse_line(line: &str) -> Result<Option<Reading>, FeedError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if let Some((name, value)) = line.split_once('=') {
        let event = normalize_name(name);
        if event.is_empty() {
            return Err(FeedError::MissingEvent);
        }
        let value = value.trim();
        if value.is_empty() {
            return Err(FeedError::MissingValue { event });
        }
        return Ok(Some(Reading::Value {
            event,
            value: Value::parse_literal(value),
        }));
    }

    let (name, signal) = line.rsplit_once(char::is_whitespace).ok_or(FeedError::Malformed)?;
    let detected = if signal.eq_ignore_ascii_case("detected") {
        true
    } else if signal.eq_ignore_ascii_case("clear") {
        false
    } else {
        return Err(FeedError::Malformed);
    };
    let event = normalize_name(name);
    if event.is_empty() {
        return Err(FeedError::MissingEvent);
    }
    Ok(Some(Reading::Anomaly { event, detected }))
}

/// Push a reading into the engine.
///
/// # Errors
///
/// Returns [`RuleEngineError`] when the event is unknown or the reading
/// does not fit it.
pub fn apply<G, L>(manager: &RuleManager<G, L>, reading: Reading) -> Result<(), RuleEngineError>
where
    G: DeviceGateway,
    L: AnomalyDescriptionLookup,
{
    match reading {
        Reading::Value { event, value } => manager.update_event_value(&event, value),
        Reading::Anomaly { event, detected } => manager
            .update_anomaly_state(&event, detected, AnomalyReading::default())
            .map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_numeric_assignment() {
        let reading = parse_line("Living Room Temperature = 27.5").unwrap();
        assert_eq!(
            reading,
            Some(Reading::Value {
                event: "living room temperature".to_string(),
                value: Value::Number(27.5),
            })
        );
    }

    #[test]
    fn should_parse_boolean_word_as_text_literal() {
        let reading = parse_line("hallway motion = on").unwrap();
        assert_eq!(
            reading,
            Some(Reading::Value {
                event: "hallway motion".to_string(),
                value: Value::Text("on".to_string()),
            })
        );
    }

    #[test]
    fn should_parse_anomaly_signals() {
        assert_eq!(
            parse_line("server room overheating detected").unwrap(),
            Some(Reading::Anomaly {
                event: "server room overheating".to_string(),
                detected: true,
            })
        );
        assert_eq!(
            parse_line("server room overheating CLEAR").unwrap(),
            Some(Reading::Anomaly {
                event: "server room overheating".to_string(),
                detected: false,
            })
        );
    }

    #[test]
    fn should_skip_blank_and_comment_lines() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# kitchen sensors").unwrap(), None);
    }

    #[test]
    fn should_reject_line_without_value() {
        assert_eq!(
            parse_line("kitchen humidity =").unwrap_err(),
            FeedError::MissingValue {
                event: "kitchen humidity".to_string()
            }
        );
    }

    #[test]
    fn should_reject_line_without_event() {
        assert_eq!(parse_line("= 3").unwrap_err(), FeedError::MissingEvent);
        assert_eq!(parse_line(" detected").unwrap_err(), FeedError::Malformed);
    }

    #[test]
    fn should_reject_unknown_signal() {
        assert_eq!(parse_line("kitchen humidity 40").unwrap_err(), FeedError::Malformed);
        assert_eq!(parse_line("kitchen").unwrap_err(), FeedError::Malformed);
    }
}
