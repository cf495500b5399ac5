// src/error.rs

//! Unified error handling for the feed trigger.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for feed trigger operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Update frequency is missing or not `<digits><h|m|s>`
    #[error("Invalid update frequency {value:?}: expected <number><h|m|s>")]
    InvalidFrequencyFormat { value: String },

    /// Last-ingested timestamp is not ISO-8601
    #[error("Invalid timestamp {value:?}: {message}")]
    InvalidTimestamp { value: String, message: String },

    /// Registry could not be reached (transport failure, timeout, 5xx)
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Registry rejected the feed query
    #[error("Registry query failed: {0}")]
    RegistryQuery(String),

    /// Registry rejected a record update
    #[error("Registry write failed: {0}")]
    RegistryWrite(String),

    /// Ingestion job could not be reached or is throttled
    #[error("Dispatch unavailable: {0}")]
    DispatchUnavailable(String),

    /// Ingestion job invocation was refused
    #[error("Dispatch rejected: {0}")]
    DispatchRejected(String),

    /// Registry schema does not match the expected feed fields
    #[error("Schema mismatch: {0}")]
    Schema(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Copyable classification of an [`AppError`], used in run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidFrequencyFormat,
    InvalidTimestamp,
    RegistryUnavailable,
    RegistryQuery,
    RegistryWrite,
    DispatchUnavailable,
    DispatchRejected,
    Schema,
    Config,
    Validation,
    Io,
    Http,
    Json,
    Toml,
    Url,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidFrequencyFormat => "InvalidFrequencyFormat",
            ErrorKind::InvalidTimestamp => "InvalidTimestamp",
            ErrorKind::RegistryUnavailable => "RegistryUnavailable",
            ErrorKind::RegistryQuery => "RegistryQueryError",
            ErrorKind::RegistryWrite => "RegistryWriteError",
            ErrorKind::DispatchUnavailable => "DispatchUnavailable",
            ErrorKind::DispatchRejected => "DispatchRejected",
            ErrorKind::Schema => "SchemaMismatch",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Io => "IoError",
            ErrorKind::Http => "HttpError",
            ErrorKind::Json => "JsonError",
            ErrorKind::Toml => "TomlError",
            ErrorKind::Url => "UrlError",
        };
        f.write_str(name)
    }
}

impl AppError {
    /// Create a frequency format error.
    pub fn invalid_frequency(value: impl Into<String>) -> Self {
        Self::InvalidFrequencyFormat {
            value: value.into(),
        }
    }

    /// Create a timestamp parsing error.
    pub fn invalid_timestamp(value: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a schema mismatch error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidFrequencyFormat { .. } => ErrorKind::InvalidFrequencyFormat,
            AppError::InvalidTimestamp { .. } => ErrorKind::InvalidTimestamp,
            AppError::RegistryUnavailable(_) => ErrorKind::RegistryUnavailable,
            AppError::RegistryQuery(_) => ErrorKind::RegistryQuery,
            AppError::RegistryWrite(_) => ErrorKind::RegistryWrite,
            AppError::DispatchUnavailable(_) => ErrorKind::DispatchUnavailable,
            AppError::DispatchRejected(_) => ErrorKind::DispatchRejected,
            AppError::Schema(_) => ErrorKind::Schema,
            AppError::Config(_) => ErrorKind::Config,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Io(_) => ErrorKind::Io,
            AppError::Http(_) => ErrorKind::Http,
            AppError::Json(_) => ErrorKind::Json,
            AppError::Toml(_) => ErrorKind::Toml,
            AppError::Url(_) => ErrorKind::Url,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::RegistryUnavailable(_) | AppError::DispatchUnavailable(_) => true,
            AppError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
