//! Engine error types.

use passabot_fetch::{AutomationError, FetchError};
use passabot_store::StoreError;
use thiserror::Error;

use crate::notify::NotifyError;

/// Errors that stop the engine.
///
/// The poll loop handles the expected failure modes itself; anything that
/// reaches the caller as an `EngineError` is fatal.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A notification could not be delivered.
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// A data source failed in a way the poll loop does not handle.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// The login ceremony failed for a reason other than a missing element.
    #[error("Authentication error: {0}")]
    Automation(#[from] AutomationError),

    /// Local storage failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
