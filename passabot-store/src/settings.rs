//! Operator settings.
//!
//! Stored as JSON at `<config_dir>/passabot/settings.json`. Every field has
//! a default, so a partial (or missing) file is valid. Secrets never live
//! here; they come from the environment or the system keychain.

use passabot_core::{AuthMode, SourceKind};
use passabot_fetch::WebDriverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_diagnostics_dir, default_settings_path, load_json, save_json};

// ============================================================================
// Settings Types
// ============================================================================

/// Operator preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Which data source to poll.
    pub source: SourceKind,

    /// How to obtain a session.
    pub auth: AuthMode,

    /// Seconds between polling cycles.
    pub poll_interval_secs: u64,

    /// Seconds to wait after a failed login.
    pub login_backoff_secs: u64,

    /// Seconds between heartbeat messages.
    pub heartbeat_interval_secs: u64,

    /// Consecutive non-empty cycles after which notifications go silent.
    pub silence_threshold: u32,

    /// Seconds the user has to approve the SPID push notification.
    pub confirmation_wait_secs: u64,

    /// Seconds to wait after consent before reading tokens.
    pub consent_settle_secs: u64,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Where diagnostic artifacts go (defaults to the cache directory).
    pub diagnostics_dir: Option<PathBuf>,

    /// Browser automation settings.
    pub webdriver: WebDriverSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            auth: AuthMode::default(),
            poll_interval_secs: 60,
            login_backoff_secs: 300,
            heartbeat_interval_secs: 3600,
            silence_threshold: 20,
            confirmation_wait_secs: 60,
            consent_settle_secs: 10,
            request_timeout_secs: 30,
            diagnostics_dir: None,
            webdriver: WebDriverSettings::default(),
        }
    }
}

impl Settings {
    /// Interval between polling cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Wait after a failed login.
    pub fn login_backoff(&self) -> Duration {
        Duration::from_secs(self.login_backoff_secs)
    }

    /// Interval between heartbeats.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Confirmation window of the login ceremony.
    pub fn confirmation_wait(&self) -> Duration {
        Duration::from_secs(self.confirmation_wait_secs)
    }

    /// Settle delay after consent.
    pub fn consent_settle(&self) -> Duration {
        Duration::from_secs(self.consent_settle_secs)
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolved diagnostics directory.
    pub fn diagnostics_dir(&self) -> PathBuf {
        self.diagnostics_dir
            .clone()
            .unwrap_or_else(default_diagnostics_dir)
    }

    /// Checks that the values make sense.
    pub fn validate(&self) -> Result<(), StoreError> {
        let positive = [
            ("poll_interval_secs", self.poll_interval_secs),
            ("login_backoff_secs", self.login_backoff_secs),
            ("heartbeat_interval_secs", self.heartbeat_interval_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(StoreError::Config(format!("{name} must be greater than zero")));
        }
        if self.silence_threshold == 0 {
            return Err(StoreError::Config(
                "silence_threshold must be at least 1".to_string(),
            ));
        }
        if self.webdriver.port == 0 && self.webdriver.url.is_none() {
            return Err(StoreError::Config(
                "webdriver.port must be set when webdriver.url is not".to_string(),
            ));
        }
        Ok(())
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverSettings {
    /// External WebDriver URL; when unset a local driver is spawned.
    pub url: Option<String>,
    /// Driver binary to spawn.
    pub binary: String,
    /// Port for the spawned driver.
    pub port: u16,
    /// Run the browser headless.
    pub headless: bool,
    /// Implicit element wait in milliseconds.
    pub implicit_wait_ms: u64,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: None,
            binary: "chromedriver".to_string(),
            port: 9515,
            headless: true,
            implicit_wait_ms: 5000,
        }
    }
}

impl WebDriverSettings {
    /// Converts to the client configuration.
    pub fn to_config(&self) -> WebDriverConfig {
        WebDriverConfig {
            url: self.url.clone(),
            binary: self.binary.clone(),
            port: self.port,
            headless: self.headless,
            implicit_wait: Duration::from_millis(self.implicit_wait_ms),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Settings bound to the file they came from.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: Settings,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store holding defaults for `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            settings: Settings::default(),
            path,
        }
    }

    /// Loads settings from the default path.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path.
    ///
    /// A missing file yields defaults. A file that exists but does not
    /// parse or validate is an error.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            let settings: Settings = load_json(&path).await.map_err(|e| {
                StoreError::Config(format!("{}: {e}", path.display()))
            })?;
            settings.validate()?;
            settings
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self { settings, path })
    }

    /// Gets the current settings.
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Updates settings in memory.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        f(&mut self.settings);
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saves settings to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        self.settings.validate()?;
        save_json(&self.path, &self.settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}
