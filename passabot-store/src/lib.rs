// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Passabot Store
//!
//! Everything passabot keeps on disk or in the system keychain:
//!
//! - **Settings**: operator preferences in a JSON file
//! - **Diagnostics**: upstream error bodies and failure screenshots
//! - **Keychain**: the SPID password
//! - **Persistence**: file I/O helpers for JSON data
//!
//! None of it feeds back into polling decisions; availability data is
//! never stored.
//!
//! ## Usage
//!
//! ```ignore
//! use passabot_store::{DiagnosticStore, SettingsStore};
//!
//! let store = SettingsStore::load_default().await?;
//! let settings = store.get();
//! let diagnostics = DiagnosticStore::new(settings.diagnostics_dir());
//! ```

pub mod diagnostics;
pub mod error;
pub mod keychain;
pub mod persistence;
pub mod settings;

pub use diagnostics::DiagnosticStore;
pub use error::StoreError;
pub use persistence::{
    default_cache_dir, default_config_dir, default_diagnostics_dir, default_settings_path,
    ensure_dir, load_json, save_json,
};
pub use settings::{Settings, SettingsStore, WebDriverSettings};
