//! Domain models for passabot.
//!
//! ## Submodules
//!
//! - [`availability`] - Availability records, slot entries and their rendering
//! - [`credentials`] - Credential bundle and login credentials
//! - [`session`] - Session lifecycle state
//! - [`selection`] - Start-up variant selection (source kind, auth mode)

mod availability;
mod credentials;
mod selection;
mod session;

pub use availability::{AvailabilityRecord, RecordDetail, SlotEntry};
pub use credentials::{CredentialBundle, LoginCredentials};
pub use selection::{AuthMode, SourceKind};
pub use session::SessionState;
