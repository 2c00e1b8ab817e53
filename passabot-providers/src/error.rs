//! Provider wiring errors.

use thiserror::Error;

use passabot_fetch::{AutomationError, FetchError};

/// Errors raised while assembling a source or authenticator.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A required input was not supplied.
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    /// The source could not be created.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A browser session could not be started.
    #[error("Automation error: {0}")]
    Automation(#[from] AutomationError),
}
