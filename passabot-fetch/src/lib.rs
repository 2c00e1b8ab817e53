// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Passabot Fetch
//!
//! Capability traits and host APIs used to talk to the appointment portal.
//!
//! ## Capability Traits
//!
//! - [`auth::Authenticator`] - Produces a [`CredentialBundle`](passabot_core::CredentialBundle)
//! - [`source::AvailabilitySource`] - Logs in with a bundle and fetches records
//!
//! ## Host APIs
//!
//! The [`host`] module provides abstractions for system interactions:
//!
//! - [`host::http`] - HTTP transport with tracing and domain allowlist
//! - [`host::automation`] - Browser automation surface
//! - [`host::webdriver`] - W3C WebDriver implementation of the surface
//! - [`host::process`] - Driver process management
//! - [`host::keychain`] - Secure credential storage (system keychain)
//!
//! ## Example
//!
//! ```ignore
//! use passabot_fetch::{Authenticator, AvailabilitySource};
//!
//! let bundle = authenticator.acquire_session().await?;
//! if source.login(bundle).await? {
//!     let records = source.fetch().await?;
//! }
//! ```

pub mod auth;
pub mod error;
pub mod host;
pub mod retry;
pub mod shutdown;
pub mod source;

// Errors
pub use error::{
    AutomationError, ErrorClass, FetchError, HttpError, KeychainError, ProcessError, UpstreamError,
};

// Host APIs
pub use host::{
    automation::{AutomationLauncher, AutomationSurface, Cookie, ElementRef, Locator},
    http::{HttpClient, HttpTransport, RawResponse},
    keychain::{KeychainApi, SystemKeychain},
    process::{DriverProcess, ProcessRunner},
    webdriver::{WebDriverConfig, WebDriverLauncher, WebDriverSession},
};

// Capabilities
pub use auth::{Authenticator, ManualAuthenticator};
pub use retry::RetryStrategy;
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
pub use source::AvailabilitySource;
