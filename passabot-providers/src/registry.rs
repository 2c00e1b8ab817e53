//! Start-up selection of source and authenticator variants.

use passabot_core::{AuthMode, CredentialBundle, LoginCredentials, SourceKind};
use passabot_fetch::{
    AutomationLauncher, Authenticator, AvailabilitySource, HttpTransport, ManualAuthenticator,
    Shutdown,
};
use passabot_store::DiagnosticStore;
use std::sync::Arc;
use tracing::info;

use crate::error::ProviderError;
use crate::passaporto::{ApiSource, CeremonySettings, InteractiveAuthenticator, PageSource};

// ============================================================================
// Sources
// ============================================================================

/// Host services shared by the source variants.
pub struct SourceDeps {
    /// Transport for the JSON API (portal domain only).
    pub transport: Arc<dyn HttpTransport>,
    /// Browser launcher for the page variant.
    pub launcher: Arc<dyn AutomationLauncher>,
    /// Jurisdiction key sent to the API (e.g. `MI`).
    pub jurisdiction: String,
}

/// Builds the source for `kind`.
///
/// The page variant launches its browser session here; the session stays
/// open until the source is closed.
pub async fn build_source(
    kind: SourceKind,
    deps: &SourceDeps,
) -> Result<Box<dyn AvailabilitySource>, ProviderError> {
    info!(kind = %kind, "Building availability source");
    match kind {
        SourceKind::Api => {
            if deps.jurisdiction.trim().is_empty() {
                return Err(ProviderError::MissingInput("jurisdiction"));
            }
            Ok(Box::new(ApiSource::new(
                deps.transport.clone(),
                deps.jurisdiction.trim(),
            )))
        }
        SourceKind::Page => {
            let surface = deps.launcher.launch().await?;
            Ok(Box::new(PageSource::new(surface)))
        }
    }
}

// ============================================================================
// Authenticators
// ============================================================================

/// Inputs the authenticator variants may need.
pub struct AuthInputs {
    /// SPID credentials (interactive mode).
    pub credentials: Option<LoginCredentials>,
    /// Pre-supplied tokens (manual mode).
    pub bundle: Option<CredentialBundle>,
    /// Browser launcher (interactive mode).
    pub launcher: Arc<dyn AutomationLauncher>,
    /// Ceremony timing.
    pub ceremony: CeremonySettings,
    /// Where to save failure screenshots.
    pub diagnostics: Option<DiagnosticStore>,
    /// Interrupts a ceremony in progress.
    pub shutdown: Shutdown,
}

/// Builds the authenticator for `mode`.
pub fn build_authenticator(
    mode: AuthMode,
    inputs: AuthInputs,
) -> Result<Arc<dyn Authenticator>, ProviderError> {
    info!(mode = %mode, "Building authenticator");
    match mode {
        AuthMode::Manual => {
            let bundle = inputs
                .bundle
                .filter(|b| !b.is_incomplete())
                .ok_or(ProviderError::MissingInput("CSRF_TOKEN and SPID_SESSION_ID"))?;
            Ok(Arc::new(ManualAuthenticator::new(bundle)))
        }
        AuthMode::Interactive => {
            let credentials = inputs
                .credentials
                .ok_or(ProviderError::MissingInput("SPID_USERNAME and SPID_PASSWORD"))?;
            let mut auth = InteractiveAuthenticator::new(inputs.launcher, credentials)
                .with_settings(inputs.ceremony)
                .with_shutdown(inputs.shutdown);
            if let Some(diagnostics) = inputs.diagnostics {
                auth = auth.with_diagnostics(diagnostics);
            }
            Ok(Arc::new(auth))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBrowser, FakeLauncher, FakePortal};

    fn deps(launcher: Arc<FakeLauncher>, jurisdiction: &str) -> SourceDeps {
        SourceDeps {
            transport: FakePortal::new(),
            launcher,
            jurisdiction: jurisdiction.to_string(),
        }
    }

    fn inputs(launcher: Arc<FakeLauncher>) -> AuthInputs {
        AuthInputs {
            credentials: None,
            bundle: None,
            launcher,
            ceremony: CeremonySettings::default(),
            diagnostics: None,
            shutdown: Shutdown::never(),
        }
    }

    #[tokio::test]
    async fn test_build_api_source() {
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new()));
        let source = build_source(SourceKind::Api, &deps(launcher.clone(), " MI "))
            .await
            .unwrap();
        assert_eq!(source.kind(), SourceKind::Api);
        assert_eq!(launcher.launches(), 0);
    }

    #[tokio::test]
    async fn test_api_source_requires_jurisdiction() {
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new()));
        let result = build_source(SourceKind::Api, &deps(launcher, "  ")).await;
        assert!(matches!(result, Err(ProviderError::MissingInput("jurisdiction"))));
    }

    #[tokio::test]
    async fn test_build_page_source_launches_browser() {
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new()));
        let source = build_source(SourceKind::Page, &deps(launcher.clone(), "MI"))
            .await
            .unwrap();
        assert_eq!(source.kind(), SourceKind::Page);
        assert_eq!(launcher.launches(), 1);
    }

    #[tokio::test]
    async fn test_manual_authenticator() {
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new()));
        let mut inputs = inputs(launcher);
        inputs.bundle = Some(CredentialBundle::new("c", "s"));

        let auth = build_authenticator(AuthMode::Manual, inputs).unwrap();
        assert_eq!(auth.mode(), AuthMode::Manual);
        assert_eq!(
            auth.acquire_session().await.unwrap(),
            CredentialBundle::new("c", "s")
        );
    }

    #[test]
    fn test_missing_inputs() {
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new()));
        assert!(matches!(
            build_authenticator(AuthMode::Manual, inputs(launcher.clone())),
            Err(ProviderError::MissingInput(_))
        ));
        assert!(matches!(
            build_authenticator(AuthMode::Interactive, inputs(launcher)),
            Err(ProviderError::MissingInput(_))
        ));
    }

    #[test]
    fn test_interactive_authenticator() {
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new()));
        let mut inputs = inputs(launcher);
        inputs.credentials = Some(LoginCredentials::new("u", "p"));
        let auth = build_authenticator(AuthMode::Interactive, inputs).unwrap();
        assert_eq!(auth.mode(), AuthMode::Interactive);
    }

    #[tokio::test]
    async fn test_interactive_authenticator_observes_shutdown() {
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new()));
        let (trigger, shutdown) = passabot_fetch::shutdown_channel();
        let mut inputs = inputs(launcher.clone());
        inputs.credentials = Some(LoginCredentials::new("u", "p"));
        inputs.shutdown = shutdown;
        trigger.trigger();

        let auth = build_authenticator(AuthMode::Interactive, inputs).unwrap();
        let err = auth.acquire_session().await.unwrap_err();
        assert!(matches!(err, passabot_fetch::AutomationError::Cancelled));
        assert_eq!(launcher.launches(), 0);
    }
}
