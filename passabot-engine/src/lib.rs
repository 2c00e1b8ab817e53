// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Passabot Engine
//!
//! The long-running part of passabot.
//!
//! ## Components
//!
//! - [`SessionManager`] - keeps a source logged in, re-authenticating on demand
//! - [`NotificationThrottle`] - turns long streaks of results into silent messages
//! - [`PollLoop`] - fetch, classify errors, dispatch notifications, wait
//! - [`Heartbeat`] - periodic silent liveness message
//! - [`NotificationSink`] - where messages go ([`TelegramSink`] in production)
//!
//! [`run_until`] runs the poll loop and the heartbeat until a shutdown
//! signal fires, lets the current cycle wind down, and closes the source
//! afterwards. Errors that escape it are reported with [`report_fatal`].
//!
//! ## Usage
//!
//! ```ignore
//! use passabot_engine::{Heartbeat, PollLoop, SessionManager, run_until};
//!
//! let session = SessionManager::new(authenticator, SessionState::LoggedOut);
//! let poll = PollLoop::new(source, session, sink.clone(), diagnostics, settings);
//! let heartbeat = Heartbeat::new(sink, Duration::from_secs(3600));
//! let (trigger, shutdown) = shutdown_channel();
//! run_until(poll, heartbeat, shutdown).await?;
//! ```

pub mod error;
pub mod heartbeat;
pub mod notify;
pub mod poll;
pub mod report;
pub mod runner;
pub mod session;
pub mod throttle;

pub use error::EngineError;
pub use heartbeat::Heartbeat;
pub use notify::{
    Channel, Message, MessageFormat, NotificationSink, NotifyError, TELEGRAM_API_DOMAIN,
    TelegramSink,
};
pub use poll::{CycleOutcome, PollLoop, PollSettings};
pub use report::{fatal_message, report_fatal};
pub use runner::run_until;
pub use session::SessionManager;
pub use throttle::{Delivery, NotificationThrottle};

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod poll_tests;
