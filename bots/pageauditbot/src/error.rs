// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for pageauditbot

use thiserror::Error;
use uuid::Uuid;

use crate::model::BrowserTarget;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pageauditbot
#[derive(Error, Debug)]
pub enum Error {
    /// The page could not be loaded. Fatal for the run: no analyzer executes
    /// and nothing is stored.
    #[error("Failed to load page: {0}")]
    Navigation(String),

    /// A single analyzer failed. The orchestrator catches this and keeps going.
    #[error("Analyzer {tool} failed: {message}")]
    Analyzer { tool: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    #[error("Browser {0} is not enabled in config")]
    BrowserDisabled(BrowserTarget),

    #[error("Audit not found: {0}")]
    AuditNotFound(Uuid),

    #[error("Page script '{probe}' failed: {message}")]
    Script { probe: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Wrap any failure raised inside an analyzer stage
    pub fn analyzer(tool: &str, err: impl std::fmt::Display) -> Self {
        Error::Analyzer {
            tool: tool.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
