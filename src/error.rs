//! Error types for OCEAN battery scoring

use thiserror::Error;

/// Errors that can occur while building catalogs, editing sessions,
/// aggregating profiles or persisting sessions
#[derive(Debug, Error)]
pub enum BatteryError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Battery import failed: {0}")]
    Import(String),

    #[error("Invalid session document: {0}")]
    Schema(String),

    #[error("A test battery is required for OCEAN analysis")]
    MissingBattery,

    #[error("Storage unavailable: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`BatteryError`], used by callers to pick a
/// recovery path without inspecting payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Import,
    Schema,
    MissingBattery,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Import => "IMPORT_ERROR",
            ErrorKind::Schema => "SCHEMA_ERROR",
            ErrorKind::MissingBattery => "MISSING_BATTERY",
            ErrorKind::Io => "IO_ERROR",
        }
    }
}

impl BatteryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BatteryError::Validation(_) => ErrorKind::Validation,
            BatteryError::NotFound(_) => ErrorKind::NotFound,
            BatteryError::Import(_) => ErrorKind::Import,
            BatteryError::Schema(_) => ErrorKind::Schema,
            BatteryError::MissingBattery => ErrorKind::MissingBattery,
            BatteryError::Io(_) => ErrorKind::Io,
        }
    }

    /// True when the failure came from the storage medium rather than the data
    pub fn is_io(&self) -> bool {
        self.kind() == ErrorKind::Io
    }
}

/// Structured validation failures for values entering a session or subject
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
