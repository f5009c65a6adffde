//! Error handling for Nocturne
//!
//! Every error carries a stable code and recovery suggestions so the
//! presentation shell can explain what went wrong without string matching.

use thiserror::Error;

/// Result type alias for Nocturne operations
pub type Result<T> = std::result::Result<T, NocturneError>;

/// Main error type for Nocturne operations
#[derive(Error, Debug)]
pub enum NocturneError {
    // Session Errors
    #[error("Audio context activation failed: {reason}")]
    ActivationFailed { reason: String },

    // Identifier Errors
    #[error("Unknown layer: {name}")]
    UnknownLayer { name: String },

    #[error("Unknown control: {name}")]
    UnknownControl { name: String },

    #[error("Unknown preset: {name}")]
    UnknownPreset { name: String },

    #[error("Malformed control assignment: {input} (expected NAME=VALUE)")]
    MalformedAssignment { input: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NocturneError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            NocturneError::ActivationFailed { .. } => "ACTIVATION_FAILED",
            NocturneError::UnknownLayer { .. } => "UNKNOWN_LAYER",
            NocturneError::UnknownControl { .. } => "UNKNOWN_CONTROL",
            NocturneError::UnknownPreset { .. } => "UNKNOWN_PRESET",
            NocturneError::MalformedAssignment { .. } => "MALFORMED_ASSIGNMENT",
            NocturneError::InvalidConfig { .. } => "INVALID_CONFIG",
            NocturneError::Io(_) => "IO_ERROR",
            NocturneError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// A failed activation leaves the session stopped and re-triable, and
    /// identifier errors never touch engine state.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            NocturneError::ActivationFailed { .. }
                | NocturneError::UnknownLayer { .. }
                | NocturneError::UnknownControl { .. }
                | NocturneError::UnknownPreset { .. }
                | NocturneError::MalformedAssignment { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            NocturneError::ActivationFailed { .. } => vec![
                "Audio output usually needs a user gesture before it can start",
                "Call start() again once the audio device is available",
            ],
            NocturneError::UnknownLayer { .. } => {
                vec!["Valid layers: pad, melody, drone, fx"]
            }
            NocturneError::UnknownControl { .. } => vec![
                "Run 'nocturne controls' to list the available controls",
            ],
            NocturneError::UnknownPreset { .. } => {
                vec!["Valid presets: solitude, mystery, contemplation, distant"]
            }
            NocturneError::MalformedAssignment { .. } => {
                vec!["Write control assignments as NAME=VALUE, e.g. pad-volume=80"]
            }
            NocturneError::InvalidConfig { .. } => vec![
                "Tempo must be positive",
                "The melody probability cap must lie in [0, 1]",
            ],
            _ => vec![],
        }
    }
}
