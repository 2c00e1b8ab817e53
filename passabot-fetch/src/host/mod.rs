//! Host APIs for passabot sources and authenticators.
//!
//! This module provides abstractions for interacting with external systems:
//!
//! - [`http`] - HTTP transport with tracing and domain allowlist
//! - [`automation`] - Browser automation surface and locators
//! - [`webdriver`] - W3C WebDriver client (chromedriver)
//! - [`process`] - Driver process discovery and lifetime
//! - [`keychain`] - Secure credential storage (system keychain)

pub mod automation;
pub mod http;
pub mod keychain;
pub mod process;
pub mod webdriver;

// Re-export key types
pub use automation::{AutomationLauncher, AutomationSurface, Cookie, ElementRef, Locator};
pub use http::{HttpClient, HttpTransport, RawResponse};
pub use keychain::{KeychainApi, SystemKeychain};
pub use process::{DriverProcess, ProcessRunner};
pub use webdriver::{WebDriverConfig, WebDriverLauncher, WebDriverSession};
