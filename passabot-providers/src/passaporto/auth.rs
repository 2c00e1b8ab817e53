//! SPID login ceremony with PosteID as identity provider.
//!
//! ## Flow
//!
//! 1. **Start**: open the portal login chooser and pick "Entra con SPID"
//! 2. **Provider**: choose PosteID and submit username and password
//! 3. **Confirm**: request a push notification and wait while the user
//!    approves it on their phone
//! 4. **Consent**: accept the attribute release, then read the CSRF token
//!    and the `JSESSIONID` cookie from the portal
//!
//! The browser session is released whether the ceremony succeeds, fails or
//! is interrupted by shutdown.

use async_trait::async_trait;
use passabot_core::{AuthMode, CredentialBundle, LoginCredentials};
use passabot_fetch::host::automation::wait_until_url_changes;
use passabot_fetch::{
    AutomationError, AutomationLauncher, AutomationSurface, Authenticator, Locator, Shutdown,
};
use passabot_store::DiagnosticStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::api::BASE_URL;

// ============================================================================
// Constants
// ============================================================================

/// Login chooser, relative to the base URL.
const LOGIN_PATH: &str = "n/sc/loginCittadino/sceltaLogin";

const SPID_BUTTON: &str = "//span[contains(text(), 'Entra con SPID')]";
const POSTEID_PROVIDER: &str = r#"//li[@data-idp="https://posteid.poste.it"]"#;
const USERNAME_ID: &str = "username";
const PASSWORD_ID: &str = "password";
const SUBMIT_BUTTON: &str = "//button[@type='submit']";
const NOTIFY_OPTION: &str = "//span[contains(., 'Voglio ricevere una notifica')]";
const CONSENT_BUTTON: &str = "//button[contains(text(), 'Acconsento')]";
const CSRF_META: &str = "//meta[@name='_csrf']";
const SESSION_COOKIE: &str = "JSESSIONID";

// ============================================================================
// Settings
// ============================================================================

/// Timing and diagnostics for the ceremony.
#[derive(Debug, Clone)]
pub struct CeremonySettings {
    /// Portal base URL (must end with `/`).
    pub base_url: String,
    /// How long the first redirect may take.
    pub redirect_timeout: Duration,
    /// How long the user has to approve the push notification.
    pub confirmation_wait: Duration,
    /// Pause after consent before reading the tokens.
    pub consent_settle: Duration,
}

impl Default for CeremonySettings {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            redirect_timeout: Duration::from_secs(5),
            confirmation_wait: Duration::from_secs(60),
            consent_settle: Duration::from_secs(10),
        }
    }
}

// ============================================================================
// Interactive Authenticator
// ============================================================================

/// Drives the SPID ceremony in a fresh browser session per call.
pub struct InteractiveAuthenticator {
    launcher: Arc<dyn AutomationLauncher>,
    credentials: LoginCredentials,
    settings: CeremonySettings,
    diagnostics: Option<DiagnosticStore>,
    shutdown: Shutdown,
}

impl InteractiveAuthenticator {
    /// Creates a new interactive authenticator.
    pub fn new(launcher: Arc<dyn AutomationLauncher>, credentials: LoginCredentials) -> Self {
        Self {
            launcher,
            credentials,
            settings: CeremonySettings::default(),
            diagnostics: None,
            shutdown: Shutdown::never(),
        }
    }

    /// Overrides the ceremony settings.
    #[must_use]
    pub fn with_settings(mut self, settings: CeremonySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Saves a screenshot there when the ceremony fails.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticStore) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Stops the ceremony early when `shutdown` fires.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    async fn fill_login_form(&self, surface: &dyn AutomationSurface) -> Result<(), AutomationError> {
        let username = surface.find(None, &Locator::id(USERNAME_ID)).await?;
        surface.type_text(&username, &self.credentials.username).await?;
        let password = surface.find(None, &Locator::id(PASSWORD_ID)).await?;
        surface.type_text(&password, &self.credentials.password).await?;
        surface.click_on(&Locator::xpath(SUBMIT_BUTTON)).await?;
        info!("Submitted login credentials");
        Ok(())
    }

    async fn read_bundle(surface: &dyn AutomationSurface) -> Result<CredentialBundle, AutomationError> {
        let meta = surface.find(None, &Locator::xpath(CSRF_META)).await?;
        let csrf_token = surface
            .attribute(&meta, "content")
            .await?
            .ok_or_else(|| AutomationError::MissingValue("CSRF token".to_string()))?;
        let session_token = surface
            .cookie(SESSION_COOKIE)
            .await?
            .ok_or_else(|| AutomationError::MissingValue("JSESSIONID cookie".to_string()))?;
        Ok(CredentialBundle::new(csrf_token, session_token))
    }

    async fn ceremony(&self, surface: &dyn AutomationSurface) -> Result<CredentialBundle, AutomationError> {
        let login_url = format!("{}{LOGIN_PATH}", self.settings.base_url);
        let spid = Locator::xpath(SPID_BUTTON);

        surface.navigate(&login_url).await?;
        surface.click_on(&spid).await?;
        wait_until_url_changes(surface, &login_url, self.settings.redirect_timeout).await?;
        surface.click_on(&spid).await?;
        surface.click_on(&Locator::xpath(POSTEID_PROVIDER)).await?;

        self.fill_login_form(surface).await?;
        surface.click_on(&Locator::xpath(NOTIFY_OPTION)).await?;

        info!(
            wait_secs = self.settings.confirmation_wait.as_secs(),
            "Waiting for the user to confirm the login..."
        );
        tokio::time::sleep(self.settings.confirmation_wait).await;
        surface.click_on(&Locator::xpath(CONSENT_BUTTON)).await?;

        tokio::time::sleep(self.settings.consent_settle).await;
        let bundle = Self::read_bundle(surface).await?;
        debug!(?bundle, "Tokens read from portal");
        Ok(bundle)
    }

    async fn capture_failure(&self, surface: &dyn AutomationSurface) {
        let Some(diagnostics) = &self.diagnostics else {
            return;
        };
        match surface.screenshot().await {
            Ok(png) => match diagnostics.write_screenshot("login-failure", &png).await {
                Ok(path) => warn!(path = %path.display(), "Saved login failure screenshot"),
                Err(e) => warn!(error = %e, "Failed to save login failure screenshot"),
            },
            Err(e) => warn!(error = %e, "Failed to capture login failure screenshot"),
        }
    }
}

#[async_trait]
impl Authenticator for InteractiveAuthenticator {
    fn id(&self) -> &str {
        "passaporto.spid"
    }

    fn mode(&self) -> AuthMode {
        AuthMode::Interactive
    }

    #[instrument(skip(self), fields(user = %self.credentials.username))]
    async fn acquire_session(&self) -> Result<CredentialBundle, AutomationError> {
        if self.shutdown.is_triggered() {
            return Err(AutomationError::Cancelled);
        }
        let mut surface = self.launcher.launch().await?;

        let result = tokio::select! {
            result = self.ceremony(surface.as_ref()) => result,
            () = self.shutdown.wait() => {
                info!("Shutdown requested, abandoning login");
                Err(AutomationError::Cancelled)
            }
        };
        match &result {
            Err(AutomationError::Cancelled) | Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Login ceremony failed");
                self.capture_failure(surface.as_ref()).await;
            }
        }

        if let Err(e) = surface.quit().await {
            warn!(error = %e, "Failed to close login browser session");
        }

        if result.is_ok() {
            info!("Logged in through SPID");
        }
        result
    }
}
