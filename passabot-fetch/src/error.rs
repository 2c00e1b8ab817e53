//! Fetch error types.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for data-source operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The portal answered with a non-success status.
    #[error("{0}")]
    Upstream(UpstreamError),

    /// The payload (or page) could not be interpreted.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The portal redirected to the login page.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// `fetch` was called before a successful `login`.
    #[error("Source is not logged in")]
    NotLoggedIn,

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Browser automation failure.
    #[error("Automation error: {0}")]
    Automation(#[from] AutomationError),
}

/// How the poll loop should react to a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Drop the session and re-authenticate on the next cycle.
    SessionInvalidating,
    /// Keep the session and try again on the next cycle.
    Transient,
    /// Stop the engine.
    Fatal,
}

impl FetchError {
    /// Classifies this error for the poll loop.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Upstream(_) | Self::SessionExpired(_) | Self::NotLoggedIn => {
                ErrorClass::SessionInvalidating
            }
            Self::Malformed(_) => ErrorClass::Transient,
            Self::Http(_) | Self::Automation(_) => ErrorClass::Fatal,
        }
    }

    /// Returns the upstream response details, if any.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            Self::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<UpstreamError> for FetchError {
    fn from(err: UpstreamError) -> Self {
        Self::Upstream(err)
    }
}

// ============================================================================
// Upstream Error
// ============================================================================

/// A non-success response from the portal, kept whole for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    /// HTTP status code.
    pub status: u16,
    /// Final request URL.
    pub url: String,
    /// Response headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: String,
}

impl UpstreamError {
    /// Formats the headers one per line.
    pub fn headers_text(&self) -> String {
        self.headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Received status code {} from the endpoint {}",
            self.status, self.url
        )
    }
}

impl std::error::Error for UpstreamError {}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Timeout.
    #[error("Request timed out")]
    Timeout,
}

impl HttpError {
    /// Wraps a reqwest error, folding timeouts into [`HttpError::Timeout`].
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err)
        }
    }
}

// ============================================================================
// Automation Error
// ============================================================================

/// Error type for browser automation.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// A required element never appeared.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// An element or cookie exists but lacks the expected value.
    #[error("Missing value: {0}")]
    MissingValue(String),

    /// The WebDriver endpoint reported an error.
    #[error("WebDriver error ({error}): {message}")]
    WebDriver {
        /// W3C error code, e.g. `no such window`.
        error: String,
        /// Human-readable message.
        message: String,
    },

    /// The WebDriver endpoint answered with something unexpected.
    #[error("Invalid WebDriver response: {0}")]
    InvalidResponse(String),

    /// A wait condition was not met in time.
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// The automation session could not be started.
    #[error("Failed to launch browser session: {0}")]
    Launch(String),

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Driver process failure.
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Shutdown was requested while the session was in use.
    #[error("Interrupted by shutdown")]
    Cancelled,
}

impl AutomationError {
    /// Returns true for the element-not-found condition.
    pub fn is_element_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound(_))
    }
}

// ============================================================================
// Keychain Error
// ============================================================================

/// Error type for keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Credential not found.
    #[error("Credential not found for {service}/{account}")]
    NotFound {
        /// Service name.
        service: String,
        /// Account name.
        account: String,
    },

    /// Access denied.
    #[error("Access denied to keychain")]
    AccessDenied,

    /// Platform error.
    #[error("Platform error: {0}")]
    Platform(String),

    /// Generic error.
    #[error("Keychain error: {0}")]
    Other(String),
}

impl From<keyring::Error> for KeychainError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => KeychainError::NotFound {
                service: String::new(),
                account: String::new(),
            },
            keyring::Error::PlatformFailure(e) => KeychainError::Platform(e.to_string()),
            keyring::Error::NoStorageAccess(_) => KeychainError::AccessDenied,
            _ => KeychainError::Other(err.to_string()),
        }
    }
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for driver process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// The process exited before becoming ready.
    #[error("Process exited early with code {0:?}")]
    ExitedEarly(Option<i32>),

    /// The process did not become ready in time.
    #[error("Process not ready after {0:?}")]
    Timeout(Duration),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
