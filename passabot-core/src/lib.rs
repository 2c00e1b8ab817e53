// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # passabot Core
//!
//! Core types and models shared by every passabot crate.
//!
//! ## Key Types
//!
//! ### Availability
//! - [`AvailabilityRecord`] - One location entry observed in a polling cycle
//! - [`RecordDetail`] - Free-form info text or an ordered slot list
//! - [`SlotEntry`] - A bookable time slot with its remaining capacity
//!
//! ### Session
//! - [`CredentialBundle`] - CSRF token + session token produced by a login
//! - [`LoginCredentials`] - Username/password pair for the interactive login
//! - [`SessionState`] - Whether the current session is usable
//!
//! ### Selection
//! - [`SourceKind`] - Which data source variant to poll
//! - [`AuthMode`] - Which authenticator variant to use

pub mod error;
pub mod html;
pub mod models;

pub use error::CoreError;

pub use models::{
    // Availability
    AvailabilityRecord,
    RecordDetail,
    SlotEntry,
    // Session
    CredentialBundle,
    LoginCredentials,
    SessionState,
    // Selection
    AuthMode,
    SourceKind,
};
