// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Passabot Providers
//!
//! Concrete sources and authenticators for the passport appointment portal
//! (`passaportonline.poliziadistato.it`).
//!
//! | Variant | Kind | Needs browser |
//! |---------|------|---------------|
//! | [`ApiSource`] | JSON API | no |
//! | [`PageSource`] | Rendered page table | yes |
//! | [`InteractiveAuthenticator`] | SPID via PosteID | yes |
//! | [`ManualAuthenticator`](passabot_fetch::ManualAuthenticator) | Pre-supplied tokens | no |
//!
//! ## Usage
//!
//! ```ignore
//! use passabot_providers::{build_source, SourceDeps};
//!
//! let source = build_source(SourceKind::Api, &deps).await?;
//! ```

pub mod error;
pub mod passaporto;
pub mod registry;

pub use error::ProviderError;
pub use passaporto::{
    ApiSource, CeremonySettings, InteractiveAuthenticator, PageSource, PassaportoApiClient,
};
pub use registry::{AuthInputs, SourceDeps, build_authenticator, build_source};

#[cfg(test)]
pub(crate) mod test_support;
