//! Passport appointment portal.
//!
//! The portal exposes the same availability data two ways:
//!
//! - a JSON API used by its own front-end (`ApiSource`), and
//! - the rendered location table of the booking wizard (`PageSource`).
//!
//! Both need an authenticated session, obtained through SPID with PosteID
//! as identity provider (`InteractiveAuthenticator`).
//!
//! ## API Endpoints
//!
//! - `POST a/rc/v1/appuntamento/elenca-sede-prima-disponibilita` - Locations with first date
//! - `POST n/rc/v1/utility/elenca-agenda-appuntamenti-sede-mese` - Monthly slots for a location

// Modules
mod api;
mod auth;
mod page;
pub(crate) mod parser;
mod sources;

// Re-exports
pub use api::{
    ALLOWED_DOMAIN, BASE_URL, LocationEntry, LocationList, PassaportoApiClient, SlotList,
    SlotListEntry,
};
pub use auth::{CeremonySettings, InteractiveAuthenticator};
pub use page::{TableRow, UNAVAILABLE_TEXT, parse_table};
pub use sources::{ApiSource, PageSource};
