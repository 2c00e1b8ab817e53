//! Start-up wiring shared by the commands.
//!
//! Reads the settings file, applies command-line overrides and builds the
//! host services (transports, browser launcher, keychain) the providers
//! and the engine are assembled from.

use anyhow::{Context, Result, bail};
use passabot_core::{AuthMode, CredentialBundle, LoginCredentials, SourceKind};
use passabot_engine::{NotificationSink, TELEGRAM_API_DOMAIN, TelegramSink};
use passabot_fetch::{
    AutomationLauncher, Authenticator, AvailabilitySource, HttpClient, HttpTransport, Shutdown,
    SystemKeychain, WebDriverLauncher, shutdown_channel,
};
use passabot_providers::passaporto::ALLOWED_DOMAIN;
use passabot_providers::{AuthInputs, CeremonySettings, SourceDeps, build_authenticator, build_source};
use passabot_store::{DiagnosticStore, Settings, SettingsStore, default_settings_path, keychain};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Cli, PortalArgs};

/// Timeout for WebDriver commands; page loads can be slow.
const WEBDRIVER_TIMEOUT: Duration = Duration::from_secs(120);

/// Resolved configuration for one invocation.
pub struct App {
    settings: Settings,
    portal: PortalArgs,
    shutdown: Shutdown,
}

impl App {
    /// Loads settings and applies overrides from the command line.
    pub async fn load(cli: &Cli) -> Result<Self> {
        let settings_path = cli.config.clone().unwrap_or_else(default_settings_path);
        let store = SettingsStore::load(settings_path)
            .await
            .context("Failed to load settings")?;

        let mut settings = store.get().clone();
        if let Some(source) = cli.portal.source {
            settings.source = source;
        }
        if let Some(auth) = cli.portal.auth {
            settings.auth = auth;
        }
        debug!(source = %settings.source, auth = %settings.auth, "Resolved settings");

        Ok(Self {
            settings,
            portal: cli.portal.clone(),
            shutdown: listen_for_interrupt(),
        })
    }

    /// Fires on Ctrl+C.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Effective settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Diagnostic artifact storage.
    pub fn diagnostics(&self) -> DiagnosticStore {
        DiagnosticStore::new(self.settings.diagnostics_dir())
    }

    /// Transport restricted to the portal.
    pub fn portal_transport(&self) -> Result<Arc<dyn HttpTransport>> {
        let client = HttpClient::with_timeout(self.settings.request_timeout())?
            .with_allowed_domains(vec![ALLOWED_DOMAIN.to_string()]);
        Ok(Arc::new(client))
    }

    /// Browser launcher. Nothing is started until the first launch.
    pub fn launcher(&self) -> Result<Arc<dyn AutomationLauncher>> {
        let transport: Arc<dyn HttpTransport> = Arc::new(HttpClient::with_timeout(WEBDRIVER_TIMEOUT)?);
        Ok(Arc::new(WebDriverLauncher::new(
            self.settings.webdriver.to_config(),
            transport,
        )))
    }

    /// Builds the configured authenticator.
    pub async fn authenticator(
        &self,
        launcher: Arc<dyn AutomationLauncher>,
    ) -> Result<Arc<dyn Authenticator>> {
        self.authenticator_for(self.settings.auth, launcher).await
    }

    /// Builds an authenticator for an explicit mode.
    pub async fn authenticator_for(
        &self,
        mode: AuthMode,
        launcher: Arc<dyn AutomationLauncher>,
    ) -> Result<Arc<dyn Authenticator>> {
        let credentials = match mode {
            AuthMode::Interactive => Some(self.login_credentials().await?),
            AuthMode::Manual => None,
        };
        let bundle = match (&self.portal.csrf_token, &self.portal.session_id) {
            (Some(csrf), Some(session)) => Some(CredentialBundle::new(csrf, session)),
            _ => None,
        };

        let inputs = AuthInputs {
            credentials,
            bundle,
            launcher,
            ceremony: CeremonySettings {
                confirmation_wait: self.settings.confirmation_wait(),
                consent_settle: self.settings.consent_settle(),
                ..CeremonySettings::default()
            },
            diagnostics: Some(self.diagnostics()),
            shutdown: self.shutdown(),
        };
        Ok(build_authenticator(mode, inputs)?)
    }

    /// Builds the configured data source.
    pub async fn source(
        &self,
        launcher: Arc<dyn AutomationLauncher>,
    ) -> Result<Box<dyn AvailabilitySource>> {
        let jurisdiction = match (&self.portal.province, self.settings.source) {
            (Some(province), _) => province.trim().to_string(),
            (None, SourceKind::Page) => String::new(),
            (None, SourceKind::Api) => bail!("TARGET_PROVINCE is not set"),
        };
        let deps = SourceDeps {
            transport: self.portal_transport()?,
            launcher,
            jurisdiction,
        };
        Ok(build_source(self.settings.source, &deps).await?)
    }

    /// Builds the Telegram sink.
    pub fn sink(&self) -> Result<Arc<dyn NotificationSink>> {
        let (Some(token), Some(data), Some(control)) = (
            self.portal.telegram_token.as_deref(),
            self.portal.data_chat_id.as_deref(),
            self.portal.control_chat_id.as_deref(),
        ) else {
            bail!("TELEGRAM_BOT_TOKEN, TELEGRAM_DATA_CHAT_ID and TELEGRAM_CONTROL_CHAT_ID must be set");
        };

        let transport = HttpClient::with_timeout(self.settings.request_timeout())?
            .with_allowed_domains(vec![TELEGRAM_API_DOMAIN.to_string()]);
        let sink = TelegramSink::new(Arc::new(transport), token, data, control)?;
        Ok(Arc::new(sink))
    }

    /// SPID username and password, the password falling back to the keychain.
    async fn login_credentials(&self) -> Result<LoginCredentials> {
        let Some(username) = self.portal.spid_username.as_deref() else {
            bail!("SPID_USERNAME is not set");
        };

        let password = match self.portal.spid_password.clone() {
            Some(password) => password,
            None => {
                info!(account = %username, "Reading SPID password from the keychain");
                keychain::spid_password(&SystemKeychain::new(), username)
                    .await?
                    .with_context(|| {
                        format!(
                            "SPID_PASSWORD is not set and no password is stored for {username}; \
                             run `passabot config set-password`"
                        )
                    })?
            }
        };

        Ok(LoginCredentials::new(username, password))
    }
}

/// Turns Ctrl+C into a shutdown signal.
fn listen_for_interrupt() -> Shutdown {
    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                trigger.trigger();
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl+C"),
        }
    });
    shutdown
}
