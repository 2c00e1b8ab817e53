//! Session acquisition.
//!
//! An [`Authenticator`] turns whatever the operator configured into a fresh
//! [`CredentialBundle`]. Implementations must be safe to call repeatedly;
//! every call starts a new ceremony.

use async_trait::async_trait;
use passabot_core::{AuthMode, CredentialBundle};
use tracing::debug;

use crate::error::AutomationError;

// ============================================================================
// Authenticator Trait
// ============================================================================

/// Produces credential bundles for the portal.
///
/// ## Implementing an Authenticator
///
/// ```ignore
/// struct StaticAuth(CredentialBundle);
///
/// #[async_trait]
/// impl Authenticator for StaticAuth {
///     fn id(&self) -> &str {
///         "static"
///     }
///
///     fn mode(&self) -> AuthMode {
///         AuthMode::Manual
///     }
///
///     async fn acquire_session(&self) -> Result<CredentialBundle, AutomationError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Unique identifier used in logs.
    fn id(&self) -> &str;

    /// The mode this authenticator implements.
    fn mode(&self) -> AuthMode;

    /// Acquires a fresh credential bundle.
    ///
    /// Fails with [`AutomationError::ElementNotFound`] when a required page
    /// element never appears during the ceremony.
    async fn acquire_session(&self) -> Result<CredentialBundle, AutomationError>;
}

// ============================================================================
// Manual Authenticator
// ============================================================================

/// Returns a bundle supplied up front by the operator.
#[derive(Debug, Clone)]
pub struct ManualAuthenticator {
    bundle: CredentialBundle,
}

impl ManualAuthenticator {
    /// Creates a new manual authenticator.
    pub fn new(bundle: CredentialBundle) -> Self {
        Self { bundle }
    }
}

#[async_trait]
impl Authenticator for ManualAuthenticator {
    fn id(&self) -> &str {
        "manual"
    }

    fn mode(&self) -> AuthMode {
        AuthMode::Manual
    }

    async fn acquire_session(&self) -> Result<CredentialBundle, AutomationError> {
        debug!("Returning pre-supplied credential bundle");
        Ok(self.bundle.clone())
    }
}
