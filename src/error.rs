use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("preferences required: {message}")]
    PreferencesMissing { message: String },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("inference error: {message}")]
    Inference { message: String },

    #[error("persistence error: {message}")]
    Persistence { message: String },

    #[error("time conflict: {message}")]
    Conflict { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn preferences_missing(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "core::dispatch", %message, "preferences missing");
        AppError::PreferencesMissing { message }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "core::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "core::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn inference(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "core::bn::inference", %message, "inference error");
        AppError::Inference { message }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "core::bn::persistence", %message, "persistence error");
        AppError::Persistence { message }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "core::conflict", %message, "time conflict");
        AppError::Conflict { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "core::other", %message, "other error");
        AppError::Other(message)
    }
}
