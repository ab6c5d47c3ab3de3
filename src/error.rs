//! Error types for the Reserva booking engine.

use thiserror::Error;

use crate::conflict::TimeRange;

/// Main error type for Reserva operations.
#[derive(Error, Debug)]
pub enum ReservaError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Conflict error: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReservaError {
    /// Build a not-found error for a slot, booking or payment record.
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }
}

/// Malformed time/date input. Rejected at the boundary, never reaches the
/// conflict detector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Invalid time (expected HH:MM): {0}")]
    Time(String),

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    Date(String),

    #[error("Minute offset out of range: {0}")]
    MinuteOffset(u32),

    #[error("Invalid session: {duration_minutes} minutes starting at offset {start_minute}")]
    Duration {
        start_minute: u16,
        duration_minutes: u16,
    },
}

/// A candidate booking overlaps an existing commitment, or a slot lost the
/// reservation race. Always recoverable by re-querying availability.
#[derive(Error, Debug, Clone)]
pub enum ConflictError {
    #[error("Candidate overlaps {} existing booking(s)", conflicts.len())]
    Overlap {
        /// The grace-expanded ranges the candidate collided with.
        conflicts: Vec<TimeRange>,
        /// Alternative start minutes on the same day, ascending.
        suggestions: Vec<u16>,
    },

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Storage-related errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type alias for Reserva operations.
pub type Result<T> = std::result::Result<T, ReservaError>;
