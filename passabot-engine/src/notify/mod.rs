//! Notification sinks.
//!
//! The engine talks to two logical channels: the data channel receives
//! availability reports, the control channel receives status notices,
//! errors and heartbeats. A sink maps them to concrete destinations.

mod telegram;

pub use telegram::{TELEGRAM_API_DOMAIN, TelegramSink};

use async_trait::async_trait;
use passabot_fetch::HttpError;
use thiserror::Error;

// ============================================================================
// Messages
// ============================================================================

/// Logical destination of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Availability reports.
    Data,
    /// Status, errors and heartbeats.
    Control,
}

impl Channel {
    /// Returns the channel name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Control => "control",
        }
    }
}

/// How the message text is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    /// HTML subset (`<b>`, `<code>`, `<pre>`).
    Html,
    /// Literal text.
    #[default]
    Plain,
}

/// A single outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message body.
    pub text: String,
    /// Body format.
    pub format: MessageFormat,
    /// Deliver without an audible alert.
    pub silent: bool,
}

impl Message {
    /// Creates a plain-text message.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: MessageFormat::Plain,
            silent: false,
        }
    }

    /// Creates an HTML message.
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: MessageFormat::Html,
            silent: false,
        }
    }

    /// Sets the silent flag.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

// ============================================================================
// Sink Trait
// ============================================================================

/// Delivers messages to the operator.
///
/// `send` is one request; concurrent calls from the poll loop and the
/// heartbeat never interleave within a message.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends a message to a channel.
    async fn send(&self, channel: Channel, message: &Message) -> Result<(), NotifyError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The request could not be sent.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// The service refused the message.
    #[error("Message rejected with status {status}: {description}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error description returned by the service.
        description: String,
    },

    /// The sink is misconfigured.
    #[error("Configuration error: {0}")]
    Config(String),
}
