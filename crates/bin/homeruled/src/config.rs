//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `homerule.toml` in the working directory (or the path in
//! `HOMERULE_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use homerule_adapter_virtual::StaticDescriptions;
use homerule_app::context::EngineConfig;
use homerule_app::services::RuleRecord;
use homerule_domain::action::{ActionKind, ActionSpec};
use homerule_domain::error::ValidationError;
use homerule_domain::event::{EventKind, EventSpec};

const DEFAULT_PATH: &str = "homerule.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Engine timing and scoping.
    pub engine: EngineSection,
    /// Sensor inventory.
    pub events: Vec<EventEntry>,
    /// Actuator inventory.
    pub actions: Vec<ActionEntry>,
    /// Authoritative rule list.
    pub rules: Vec<RuleRecord>,
    /// Free-text names rule authors may use for anomaly events.
    pub anomaly_descriptions: Vec<DescriptionEntry>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// `[engine]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub conflict_cooldown_secs: u64,
    pub repeat_cooldown_secs: u64,
    pub notification_resend_secs: u64,
    /// Scope handed to the anomaly description lookup.
    pub space_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventEntry {
    pub name: String,
    pub kind: EventKind,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionEntry {
    pub kind: ActionKind,
    pub location: String,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionEntry {
    pub description: String,
    pub event: String,
    /// Restrict the entry to one space; unscoped entries answer every space.
    #[serde(default)]
    pub space_id: Option<String>,
}

impl Config {
    /// Load configuration from `homerule.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HOMERULE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOMERULE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("HOMERULE_SPACE_ID") {
            self.engine.space_id = Some(val).filter(|s| !s.is_empty());
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.conflict_cooldown_secs < self.engine.repeat_cooldown_secs {
            return Err(ConfigError::Validation(
                "conflict cooldown must not be shorter than repeat cooldown".to_string(),
            ));
        }
        self.event_specs()?;
        self.action_specs()?;
        Ok(())
    }

    /// Engine settings derived from the `[engine]` section.
    #[must_use]
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            conflict_cooldown: Duration::from_secs(self.engine.conflict_cooldown_secs),
            repeat_cooldown: Duration::from_secs(self.engine.repeat_cooldown_secs),
            notification_resend: Duration::from_secs(self.engine.notification_resend_secs),
            space_id: self.engine.space_id.clone(),
        }
    }

    /// Sensor inventory as validated specs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Inventory`] when an entry has a blank name or
    /// location.
    pub fn event_specs(&self) -> Result<Vec<EventSpec>, ConfigError> {
        self.events
            .iter()
            .map(|e| EventSpec::new(&e.name, e.kind, &e.location).map_err(ConfigError::from))
            .collect()
    }

    /// Actuator inventory as validated specs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Inventory`] when an entry has a blank location.
    pub fn action_specs(&self) -> Result<Vec<ActionSpec>, ConfigError> {
        self.actions
            .iter()
            .map(|a| ActionSpec::new(a.kind, &a.location, a.target.clone()).map_err(ConfigError::from))
            .collect()
    }

    /// Description table for the anomaly lookup.
    #[must_use]
    pub fn descriptions(&self) -> StaticDescriptions {
        let mut table = StaticDescriptions::new();
        for entry in &self.anomaly_descriptions {
            table.insert(entry.space_id.as_deref(), &entry.description, &entry.event);
        }
        table
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homeruled=info,homerule_app=info,homerule_adapter_virtual=info".to_string(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            conflict_cooldown_secs: defaults.conflict_cooldown.as_secs(),
            repeat_cooldown_secs: defaults.repeat_cooldown.as_secs(),
            notification_resend_secs: defaults.notification_resend.as_secs(),
            space_id: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// An inventory entry is malformed.
    #[error("invalid inventory entry")]
    Inventory(#[from] ValidationError),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
