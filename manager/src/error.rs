//! Error types for manager configuration.
//!
//! Command lifecycle operations never fail with these; they report problems
//! through their outcome's `ValidationResult`.

use thiserror::Error;

/// Errors that can occur while loading or saving manager configuration.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Configuration parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results with [`ManagerError`].
pub type Result<T> = std::result::Result<T, ManagerError>;
