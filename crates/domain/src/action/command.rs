//! Commands resolved from action text, and the relevance diff behind
//! idempotent dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Lowest accepted climate set point, in °C.
pub const MIN_TEMPERATURE: f64 = 10.0;
/// Highest accepted climate set point, in °C.
pub const MAX_TEMPERATURE: f64 = 35.0;

/// Operating mode of a climate unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClimateMode {
    Cool,
    Heat,
    Dry,
    Fan,
    Auto,
}

impl ClimateMode {
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "cool" | "cooling" => Some(Self::Cool),
            "heat" | "heating" => Some(Self::Heat),
            "dry" => Some(Self::Dry),
            "fan" => Some(Self::Fan),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for ClimateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cool => f.write_str("cool"),
            Self::Heat => f.write_str("heat"),
            Self::Dry => f.write_str("dry"),
            Self::Fan => f.write_str("fan"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

/// Requested (or last known) state of a climate unit.
///
/// `temperature` and `mode` are `None` when the command did not ask for
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateState {
    pub on: bool,
    pub temperature: Option<f64>,
    pub mode: Option<ClimateMode>,
}

impl ClimateState {
    #[must_use]
    pub fn off() -> Self {
        Self {
            on: false,
            temperature: None,
            mode: None,
        }
    }
}

impl fmt::Display for ClimateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.on { "on" } else { "off" })?;
        if let Some(t) = self.temperature {
            write!(f, " {t}")?;
        }
        if let Some(mode) = self.mode {
            write!(f, " {mode}")?;
        }
        Ok(())
    }
}

/// A fully resolved instruction for one actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Command {
    Climate(ClimateState),
    Light { on: bool },
    Notification { address: String, message: String },
}

impl Command {
    /// Short intent label used for conflict arbitration and logs. It names
    /// no location, so arbitration compares intents across every unit of a
    /// class.
    #[must_use]
    pub fn intent(&self) -> String {
        self.to_string()
    }

    /// Whether dispatching `self` would change anything compared with the
    /// last dispatched command.
    ///
    /// Power is always relevant. A climate set point or mode is relevant
    /// only when this command asks for it, and only while powering on.
    #[must_use]
    pub fn is_relevant_change(&self, last: Option<&Command>) -> bool {
        match (self, last) {
            (_, None) => true,
            (Self::Climate(next), Some(Self::Climate(prev))) => {
                if next.on != prev.on {
                    return true;
                }
                if !next.on {
                    return false;
                }
                let temperature_changed = next
                    .temperature
                    .is_some_and(|t| prev.temperature.is_none_or(|p| (t - p).abs() >= f64::EPSILON));
                let mode_changed = next.mode.is_some_and(|m| prev.mode != Some(m));
                temperature_changed || mode_changed
            }
            (Self::Light { on: next }, Some(Self::Light { on: prev })) => next != prev,
            (
                Self::Notification { address, message },
                Some(Self::Notification {
                    address: prev_address,
                    message: prev_message,
                }),
            ) => address != prev_address || message != prev_message,
            (_, Some(_)) => true,
        }
    }

    /// State to remember after a successful dispatch: a climate command
    /// that powers on without a set point or mode keeps the last known ones.
    #[must_use]
    pub fn merged_over(&self, last: Option<&Command>) -> Command {
        match (self, last) {
            (Self::Climate(next), Some(Self::Climate(prev))) if next.on => {
                Self::Climate(ClimateState {
                    on: true,
                    temperature: next.temperature.or(prev.temperature),
                    mode: next.mode.or(prev.mode),
                })
            }
            (Self::Climate(next), Some(Self::Climate(prev))) => Self::Climate(ClimateState {
                on: false,
                temperature: prev.temperature,
                mode: prev.mode,
            }),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Climate(state) => state.fmt(f),
            Self::Light { on } => f.write_str(if *on { "on" } else { "off" }),
            Self::Notification { address, .. } => write!(f, "notify {address}"),
        }
    }
}

/// Last command an actuator accepted, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchedState {
    pub command: Command,
    pub at: Timestamp,
}

/// Why action text could not be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("action `{action}` is not handled by this actuator")]
    NotHandled { action: String },

    #[error("action does not say `on` or `off`")]
    MissingPower,

    #[error("action says both `on` and `off`")]
    ConflictingPower,

    #[error("unexpected word `{word}` in action")]
    UnexpectedWord { word: String },

    #[error("temperature {value} is outside {MIN_TEMPERATURE}..={MAX_TEMPERATURE}")]
    TemperatureOutOfRange { value: f64 },

    #[error("cannot set temperature or mode while turning off")]
    OffWithSettings,

    #[error("notification has no address")]
    MissingAddress,
}
