//! Error types for caller contract violations.
//!
//! Bad user data never surfaces here; it is reported through
//! [`ValidationResult`](command_template_core::ValidationResult). These
//! errors mean the caller asked for something the definition cannot express.

use thiserror::Error;

/// Errors raised by the builder and the build validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A selected option or option value names a flag the command never declared.
    #[error("option is not declared by this command: {0}")]
    UndeclaredOption(String),

    /// A parameter value was supplied for a parameter the command never declared.
    #[error("parameter is not declared by this command: {0}")]
    UndeclaredParameter(String),

    /// A required value is missing and the build was asked to enforce it.
    #[error("missing required value for parameter '{0}'")]
    MissingRequiredValue(String),

    /// A trailing segment uses a symbol that is not a registered operator.
    #[error("unknown separator: {0}")]
    UnknownSeparator(String),
}

/// Convenience alias for results with [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;
