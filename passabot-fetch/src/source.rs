//! Availability source trait.

use async_trait::async_trait;
use passabot_core::{AvailabilityRecord, CredentialBundle, SourceKind};

use crate::error::FetchError;

/// A way of reading availability records from the portal.
///
/// The poll loop only ever sees `Box<dyn AvailabilitySource>`; the concrete
/// variant is chosen once at start-up.
#[async_trait]
pub trait AvailabilitySource: Send {
    /// Unique identifier used in logs.
    fn id(&self) -> &str;

    /// The kind of source.
    fn kind(&self) -> SourceKind;

    /// Installs a credential bundle.
    ///
    /// Returns `Ok(false)` exactly when the source could not reach the state
    /// it needs because a page element was missing. Any other failure is an
    /// error.
    async fn login(&mut self, bundle: CredentialBundle) -> Result<bool, FetchError>;

    /// Fetches the current records, keeping only those with a first
    /// available date.
    async fn fetch(&mut self) -> Result<Vec<AvailabilityRecord>, FetchError>;

    /// Releases any resources held by the source.
    async fn close(&mut self) -> Result<(), FetchError> {
        Ok(())
    }
}
