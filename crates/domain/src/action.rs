//! Action — an actuator that rules can drive.
//!
//! An [`ActionSpec`] names one physical actuator (kind + location, plus an
//! optional default target such as a phone number). It decides whether a
//! rule's action text is addressed to it and owns the per-kind
//! micro-grammar that turns that text into a [`Command`].

mod command;

pub use command::{
    ClimateMode, ClimateState, Command, CommandError, DispatchedState, MAX_TEMPERATURE,
    MIN_TEMPERATURE,
};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::event::normalize_name;

/// Actuator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Climate,
    Light,
    Notification,
}

impl ActionKind {
    /// Words that address this kind in action text.
    #[must_use]
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Climate => &["ac", "climate", "hvac", "aircon"],
            Self::Light => &["light", "lights", "lamp"],
            Self::Notification => &["sms", "notify", "notification", "whatsapp"],
        }
    }

    /// Whether the actuator class can receive conflicting intents from
    /// several independent rules.
    #[must_use]
    pub fn has_global_conflict(self) -> bool {
        matches!(self, Self::Climate)
    }

    fn is_keyword(self, word: &str) -> bool {
        self.keywords().iter().any(|k| word.eq_ignore_ascii_case(k))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Climate => f.write_str("climate"),
            Self::Light => f.write_str("light"),
            Self::Notification => f.write_str("notification"),
        }
    }
}

/// Static description of one actuator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub kind: ActionKind,
    /// Normalized location, e.g. `living room`.
    pub location: String,
    /// Default target; for notifications, the fallback address.
    pub target: Option<String>,
}

impl ActionSpec {
    /// Build a spec with a normalized location.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyLocation`] when `location` is blank.
    pub fn new(
        kind: ActionKind,
        location: impl AsRef<str>,
        target: Option<String>,
    ) -> Result<Self, ValidationError> {
        let location = normalize_name(location.as_ref());
        if location.is_empty() {
            return Err(ValidationError::EmptyLocation);
        }
        let target = target.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        Ok(Self {
            kind,
            location,
            target,
        })
    }

    /// Registry identity: `kind_location_signature`, spaces replaced by `_`.
    #[must_use]
    pub fn key(&self) -> String {
        let signature = self.target.as_deref().unwrap_or("default");
        format!("{}_{}_{}", self.kind, self.location, signature).replace(' ', "_")
    }

    /// Whether `action_text` names both this actuator's location and one
    /// of its kind keywords, as whole words.
    #[must_use]
    pub fn can_handle(&self, action_text: &str) -> bool {
        let words = words(action_text);
        self.location_span(&words).is_some() && words.iter().any(|w| self.kind.is_keyword(w.bare))
    }

    /// Resolve `action_text` into a command for this actuator.
    ///
    /// `condition_text` is used for the default notification message.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the text is not addressed to this
    /// actuator or does not follow its kind's grammar.
    pub fn parse_command(
        &self,
        action_text: &str,
        condition_text: &str,
    ) -> Result<Command, CommandError> {
        let words = words(action_text);
        let not_handled = || CommandError::NotHandled {
            action: action_text.to_string(),
        };
        let (start, len) = self.location_span(&words).ok_or_else(not_handled)?;
        let mut rest: Vec<Word<'_>> = words[..start]
            .iter()
            .chain(&words[start + len..])
            .copied()
            .collect();
        let keyword_at = rest
            .iter()
            .position(|w| self.kind.is_keyword(w.bare))
            .ok_or_else(not_handled)?;
        rest.remove(keyword_at);

        match self.kind {
            ActionKind::Climate => parse_climate(&rest).map(Command::Climate),
            ActionKind::Light => parse_light(&rest),
            ActionKind::Notification => self.parse_notification(&rest, condition_text),
        }
    }

    fn location_span(&self, words: &[Word<'_>]) -> Option<(usize, usize)> {
        let location: Vec<&str> = self.location.split(' ').collect();
        words
            .windows(location.len())
            .position(|window| {
                window
                    .iter()
                    .zip(&location)
                    .all(|(w, l)| w.bare.eq_ignore_ascii_case(l))
            })
            .map(|start| (start, location.len()))
    }

    /// The message keeps the words as written, punctuation included.
    fn parse_notification(&self, rest: &[Word<'_>], condition_text: &str) -> Result<Command, CommandError> {
        let address_at = rest.iter().position(|w| is_address(w.bare));
        let address = address_at
            .map(|i| rest[i].bare.to_string())
            .or_else(|| self.target.clone())
            .ok_or(CommandError::MissingAddress)?;
        let message_words: Vec<&str> = rest
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != address_at)
            .map(|(_, w)| w.raw)
            .collect();
        let message = if message_words.is_empty() {
            format!("Rule condition met: {condition_text}")
        } else {
            message_words.join(" ")
        };
        Ok(Command::Notification { address, message })
    }
}

/// A whitespace-separated word: `raw` as written, `bare` without
/// surrounding `,;` and a trailing `.`.
#[derive(Debug, Clone, Copy)]
struct Word<'a> {
    raw: &'a str,
    bare: &'a str,
}

fn words(text: &str) -> Vec<Word<'_>> {
    text.split_whitespace()
        .map(|raw| Word {
            raw,
            bare: raw.trim_matches([',', ';']).trim_end_matches('.'),
        })
        .filter(|w| !w.bare.is_empty())
        .collect()
}

const MIN_PHONE_DIGITS: usize = 7;

/// Phone numbers (`+` prefix or a bare digit run of phone length, with
/// optional `-` separators) and e-mail addresses.
fn is_address(word: &str) -> bool {
    let phone = word.strip_prefix('+').unwrap_or(word);
    let is_phone = phone.chars().all(|c| c.is_ascii_digit() || c == '-')
        && phone.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS;
    let is_email = word.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });
    is_phone || is_email
}

const FILLER_WORDS: [&str; 10] = [
    "turn", "switch", "set", "to", "at", "the", "mode", "degrees", "temperature", "please",
];

fn is_filler(word: &str) -> bool {
    FILLER_WORDS.iter().any(|f| word.eq_ignore_ascii_case(f))
}

fn parse_power(word: &str) -> Option<bool> {
    if word.eq_ignore_ascii_case("on") {
        Some(true)
    } else if word.eq_ignore_ascii_case("off") {
        Some(false)
    } else {
        None
    }
}

fn record_power(power: &mut Option<bool>, on: bool) -> Result<(), CommandError> {
    match *power {
        Some(previous) if previous != on => Err(CommandError::ConflictingPower),
        _ => {
            *power = Some(on);
            Ok(())
        }
    }
}

fn parse_temperature(word: &str) -> Option<f64> {
    let digits = word.trim_end_matches(['c', 'C']).trim_end_matches('°');
    digits.parse::<f64>().ok().filter(|t| t.is_finite())
}

fn parse_climate(words: &[Word<'_>]) -> Result<ClimateState, CommandError> {
    let mut power = None;
    let mut temperature = None;
    let mut mode = None;

    for word in words.iter().map(|w| w.bare) {
        if let Some(on) = parse_power(word) {
            record_power(&mut power, on)?;
        } else if let Some(t) = parse_temperature(word) {
            if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) {
                return Err(CommandError::TemperatureOutOfRange { value: t });
            }
            temperature = Some(t);
        } else if let Some(m) = ClimateMode::from_word(word) {
            mode = Some(m);
        } else if !is_filler(word) {
            return Err(CommandError::UnexpectedWord {
                word: word.to_string(),
            });
        }
    }

    let has_settings = temperature.is_some() || mode.is_some();
    match power {
        Some(false) if has_settings => Err(CommandError::OffWithSettings),
        Some(on) => Ok(ClimateState {
            on,
            temperature,
            mode,
        }),
        None if has_settings => Ok(ClimateState {
            on: true,
            temperature,
            mode,
        }),
        None => Err(CommandError::MissingPower),
    }
}

fn parse_light(words: &[Word<'_>]) -> Result<Command, CommandError> {
    let mut power = None;
    for word in words.iter().map(|w| w.bare) {
        if let Some(on) = parse_power(word) {
            record_power(&mut power, on)?;
        } else if !is_filler(word) {
            return Err(CommandError::UnexpectedWord {
                word: word.to_string(),
            });
        }
    }
    power
        .map(|on| Command::Light { on })
        .ok_or(CommandError::MissingPower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn living_room_ac() -> ActionSpec {
        ActionSpec::new(ActionKind::Climate, "Living Room", None).unwrap()
    }

    #[test]
    fn should_derive_key_from_kind_location_and_target() {
        assert_eq!(living_room_ac().key(), "climate_living_room_default");
        let sms = ActionSpec::new(ActionKind::Notification, "home", Some("+15550100".into())).unwrap();
        assert_eq!(sms.key(), "notification_home_+15550100");
    }

    #[test]
    fn should_handle_text_naming_location_and_keyword() {
        let ac = living_room_ac();
        assert!(ac.can_handle("living room ac on 21 cool"));
        assert!(ac.can_handle("Turn on the Living Room HVAC"));
        assert!(!ac.can_handle("bedroom ac on"));
        assert!(!ac.can_handle("living room light on"));
    }

    #[test]
    fn should_match_whole_words_only() {
        let hall = ActionSpec::new(ActionKind::Light, "hall", None).unwrap();
        assert!(!hall.can_handle("hallway light on"));
        assert!(hall.can_handle("hall lights off."));
    }

    #[test]
    fn should_parse_climate_on_with_temperature_and_mode() {
        let cmd = living_room_ac()
            .parse_command("living room ac on 21 cool", "t > 25")
            .unwrap();
        assert_eq!(
            cmd,
            Command::Climate(ClimateState {
                on: true,
                temperature: Some(21.0),
                mode: Some(ClimateMode::Cool),
            })
        );
    }

    #[test]
    fn should_imply_on_when_only_settings_given() {
        let cmd = living_room_ac()
            .parse_command("set living room ac to 23°C heat", "")
            .unwrap();
        assert_eq!(
            cmd,
            Command::Climate(ClimateState {
                on: true,
                temperature: Some(23.0),
                mode: Some(ClimateMode::Heat),
            })
        );
    }

    #[test]
    fn should_parse_climate_off() {
        let cmd = living_room_ac().parse_command("living room ac off", "").unwrap();
        assert_eq!(cmd, Command::Climate(ClimateState::off()));
    }

    #[test]
    fn should_reject_off_with_settings() {
        let err = living_room_ac()
            .parse_command("living room ac off 21", "")
            .unwrap_err();
        assert_eq!(err, CommandError::OffWithSettings);
    }

    #[test]
    fn should_reject_temperature_out_of_range() {
        let err = living_room_ac()
            .parse_command("living room ac on 60", "")
            .unwrap_err();
        assert_eq!(err, CommandError::TemperatureOutOfRange { value: 60.0 });
    }

    #[test]
    fn should_reject_conflicting_power_words() {
        let err = living_room_ac()
            .parse_command("living room ac on off", "")
            .unwrap_err();
        assert_eq!(err, CommandError::ConflictingPower);
    }

    #[test]
    fn should_reject_missing_power() {
        let err = living_room_ac().parse_command("living room ac", "").unwrap_err();
        assert_eq!(err, CommandError::MissingPower);
    }

    #[test]
    fn should_reject_text_for_other_location() {
        let err = living_room_ac().parse_command("bedroom ac on", "").unwrap_err();
        assert!(matches!(err, CommandError::NotHandled { .. }));
    }

    #[test]
    fn should_parse_light_power() {
        let lamp = ActionSpec::new(ActionKind::Light, "kitchen", None).unwrap();
        assert_eq!(
            lamp.parse_command("turn kitchen light on", "").unwrap(),
            Command::Light { on: true }
        );
        assert!(matches!(
            lamp.parse_command("kitchen light dim", "").unwrap_err(),
            CommandError::UnexpectedWord { .. }
        ));
    }

    #[test]
    fn should_parse_notification_address_and_message() {
        let sms = ActionSpec::new(ActionKind::Notification, "home", None).unwrap();
        let cmd = sms
            .parse_command("home sms +15550100 server room is hot", "server temperature > 30")
            .unwrap();
        assert_eq!(
            cmd,
            Command::Notification {
                address: "+15550100".to_string(),
                message: "server room is hot".to_string(),
            }
        );
    }

    #[test]
    fn should_derive_notification_message_from_condition() {
        let sms = ActionSpec::new(ActionKind::Notification, "home", Some("ops@example.com".into()))
            .unwrap();
        let cmd = sms.parse_command("home notify", "garage anomaly == true").unwrap();
        assert_eq!(
            cmd,
            Command::Notification {
                address: "ops@example.com".to_string(),
                message: "Rule condition met: garage anomaly == true".to_string(),
            }
        );
    }

    #[test]
    fn should_keep_numbers_in_message_when_target_is_configured() {
        let sms = ActionSpec::new(ActionKind::Notification, "home", Some("+15550100".into())).unwrap();
        let cmd = sms.parse_command("home sms 3 freezers offline", "").unwrap();
        assert_eq!(
            cmd,
            Command::Notification {
                address: "+15550100".to_string(),
                message: "3 freezers offline".to_string(),
            }
        );
    }

    #[test]
    fn should_recognize_phone_and_email_addresses() {
        assert!(is_address("+15550100"));
        assert!(is_address("555-0100-22"));
        assert!(is_address("ops@example.com"));
        assert!(!is_address("3"));
        assert!(!is_address("2024"));
        assert!(!is_address("+3"));
        assert!(!is_address("@home"));
        assert!(!is_address("me@localhost"));
    }

    #[test]
    fn should_keep_punctuation_in_explicit_message() {
        let sms = ActionSpec::new(ActionKind::Notification, "home", None).unwrap();
        let cmd = sms
            .parse_command("home sms +15550100 Server hot. Check now, mode=eco!", "")
            .unwrap();
        assert_eq!(
            cmd,
            Command::Notification {
                address: "+15550100".to_string(),
                message: "Server hot. Check now, mode=eco!".to_string(),
            }
        );
    }

    #[test]
    fn should_reject_notification_without_address() {
        let sms = ActionSpec::new(ActionKind::Notification, "home", None).unwrap();
        assert_eq!(
            sms.parse_command("home sms", "a > 1").unwrap_err(),
            CommandError::MissingAddress
        );
    }

    #[test]
    fn should_flag_climate_as_globally_conflicting() {
        assert!(ActionKind::Climate.has_global_conflict());
        assert!(!ActionKind::Light.has_global_conflict());
    }
}
