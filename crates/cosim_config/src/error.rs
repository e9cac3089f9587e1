//! Errors raised while reading or validating `cosim.toml`.
//!
//! Everything here is reported before the first clock tick; a run that has
//! started never sees a configuration error.

/// Configuration loading and validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A setting parsed but is out of range or conflicts with another.
    #[error("invalid {field}: {reason}")]
    ValidationError {
        /// Dotted key of the offending setting, e.g. `uart.baud_period`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for a validation failure on `field`.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field,
            reason: reason.into(),
        }
    }

    /// The setting a validation failure refers to.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::ValidationError { field, .. } => Some(field),
            _ => None,
        }
    }
}
