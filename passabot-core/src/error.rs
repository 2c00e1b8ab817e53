//! Core error types for passabot.

use thiserror::Error;

/// Core error type for model-level operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A value could not be parsed into a domain type.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Name of the field being parsed.
        field: &'static str,
        /// The offending input.
        value: String,
    },
}
