use thiserror::Error;

use crate::entity::NoteId;

#[derive(Error, Debug)]
pub enum CarnetError {
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    #[error("Unknown note field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Local storage quota exceeded: {needed} bytes needed, {capacity} bytes available")]
    QuotaExceeded { needed: usize, capacity: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Engine is not running")]
    EngineStopped,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CarnetError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CarnetError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CarnetError>;
