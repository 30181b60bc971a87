// Error Types
//
// Every fatal error maps to exit code 1. Recoverable failures (history
// cleanup, single score updates) are carried as values inside the reports
// instead of being raised.

use thiserror::Error;

use crate::constants::EXIT_FAILURE;

/// Problems found before any remote call is attempted
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingCredential(&'static str),

    #[error("failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures reported by (or on the way to) the hosted backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid credential header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("backend rejected request ({}): {message}", status_label(.status, .code))]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("remote procedure `{0}` is not available")]
    ProcedureUnavailable(String),

    #[error("no rows matched {0}")]
    NoRowsAffected(String),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn status_label(status: &u16, code: &Option<String>) -> String {
    match code {
        Some(code) => format!("{}, {}", status, code),
        None => status.to_string(),
    }
}

impl StoreError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        StoreError::Rejected {
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::ProcedureUnavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no employee matched the name filter")]
    NoMatches,

    #[error("employee lookup failed: {0}")]
    Lookup(#[source] StoreError),

    #[error("failed to connect: {0}")]
    Connect(#[source] StoreError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl MaintenanceError {
    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("schema submission failed: {0}")]
    Submission(#[source] StoreError),

    #[error("failed to connect: {0}")]
    Connect(#[source] StoreError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ProvisionError {
    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }
}
