//! Error types shared across the planner.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dayplan.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// A task, card or event id that does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u32 },

    /// Malformed request (empty name, non-positive hours, bad recurrence flags).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlannerError {
    pub fn task_not_found(id: u32) -> Self {
        PlannerError::NotFound { kind: "Task", id }
    }

    pub fn card_not_found(id: u32) -> Self {
        PlannerError::NotFound { kind: "Card", id }
    }

    pub fn event_not_found(id: u32) -> Self {
        PlannerError::NotFound { kind: "Event", id }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        PlannerError::InvalidArgument(message.into())
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for PlannerError
pub type Result<T, E = PlannerError> = std::result::Result<T, E>;
