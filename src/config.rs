//! Credentials and settings
//!
//! Credentials only ever come from the two environment variables. Everything
//! else (name patterns, target score, procedure names) is read from an
//! optional `staffops.toml`, overridden by `STAFFOPS__SECTION__KEY`
//! environment variables, and falls back to built-in defaults.
//!
//! Both values are built once at start-up and passed into the operations
//! that need them.

use std::fmt;
use std::path::Path;

pub use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;

use crate::constants::{
    DEFAULT_NAME_PATTERNS, DEFAULT_TARGET_SCORE, ENV_SERVICE_KEY, ENV_URL, FALLBACK_ARGUMENT,
    FALLBACK_PROCEDURE, PRIMARY_ARGUMENT, PRIMARY_PROCEDURE,
};
use crate::error::ConfigError;

pub const DEFAULT_SETTINGS_FILE: &str = "staffops.toml";
pub const ENV_PREFIX: &str = "STAFFOPS";

#[derive(Clone)]
pub struct Credentials {
    pub url: String,
    pub service_key: String,
}

impl Credentials {
    /// Read both credentials through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingCredential(name))
        };

        let url = read(ENV_URL)?;
        let service_key = read(ENV_SERVICE_KEY)?;

        Ok(Self { url, service_key })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

// The key must never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MaintenanceSettings {
    /// SQL LIKE patterns (`%`, `_`), OR-composed
    pub patterns: Vec<String>,
    pub case_sensitive: bool,
    pub target_score: i64,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_NAME_PATTERNS.iter().map(|p| p.to_string()).collect(),
            case_sensitive: false,
            target_score: DEFAULT_TARGET_SCORE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProvisionSettings {
    pub procedure: String,
    pub procedure_argument: String,
    pub fallback_procedure: String,
    pub fallback_argument: String,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            procedure: PRIMARY_PROCEDURE.to_string(),
            procedure_argument: PRIMARY_ARGUMENT.to_string(),
            fallback_procedure: FALLBACK_PROCEDURE.to_string(),
            fallback_argument: FALLBACK_ARGUMENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub maintenance: MaintenanceSettings,
    pub provision: ProvisionSettings,
}

impl Settings {
    /// Load settings from `path` (missing file is fine) plus environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (source, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_SETTINGS_FILE), false),
        };

        let config = Config::builder()
            .add_source(ConfigFile::from(source).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("maintenance.patterns")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.maintenance.patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "maintenance.patterns must contain at least one pattern".to_string(),
            ));
        }
        if self.provision.procedure.trim().is_empty()
            || self.provision.fallback_procedure.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "provision procedures must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
