//! W3C WebDriver client.
//!
//! Speaks the WebDriver wire protocol over [`HttpTransport`] to a
//! chromedriver instance, either an external one at a configured URL or a
//! local [`DriverProcess`] started on first use.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::automation::{AutomationLauncher, AutomationSurface, Cookie, ElementRef, Locator};
use super::http::{HttpTransport, RawResponse};
use super::process::DriverProcess;
use crate::error::AutomationError;

/// JSON key identifying a web element in WebDriver payloads.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// How long a spawned driver may take to start listening.
const DRIVER_READY_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Configuration
// ============================================================================

/// WebDriver connection settings.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// External WebDriver URL. When `None`, a local driver is spawned.
    pub url: Option<String>,
    /// Driver binary to spawn.
    pub binary: String,
    /// Port for the spawned driver.
    pub port: u16,
    /// Run the browser without a window.
    pub headless: bool,
    /// Implicit element wait.
    pub implicit_wait: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: None,
            binary: "chromedriver".to_string(),
            port: 9515,
            headless: true,
            implicit_wait: Duration::from_secs(5),
        }
    }
}

impl WebDriverConfig {
    /// Builds the new-session capabilities payload.
    pub fn capabilities(&self) -> Value {
        let mut args = vec!["--no-sandbox"];
        if self.headless {
            args.push("--headless");
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

// ============================================================================
// Launcher
// ============================================================================

/// Starts WebDriver sessions, spawning the driver lazily.
pub struct WebDriverLauncher {
    config: WebDriverConfig,
    transport: Arc<dyn HttpTransport>,
    driver: OnceCell<DriverProcess>,
}

impl WebDriverLauncher {
    /// Creates a new launcher.
    pub fn new(config: WebDriverConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            driver: OnceCell::new(),
        }
    }

    /// Returns the WebDriver base URL, starting the driver if needed.
    async fn endpoint(&self) -> Result<String, AutomationError> {
        if let Some(url) = &self.config.url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        let driver = self
            .driver
            .get_or_try_init(|| {
                DriverProcess::spawn(&self.config.binary, self.config.port, DRIVER_READY_TIMEOUT)
            })
            .await?;
        Ok(driver.url())
    }

    /// Starts a session and returns the concrete handle.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<WebDriverSession, AutomationError> {
        let endpoint = self.endpoint().await?;
        WebDriverSession::create(self.transport.clone(), &endpoint, &self.config).await
    }
}

#[async_trait]
impl AutomationLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn AutomationSurface>, AutomationError> {
        Ok(Box::new(self.start().await?))
    }
}

// ============================================================================
// Session
// ============================================================================

/// A live WebDriver session.
///
/// Dropping an open session schedules a best-effort delete on the current
/// runtime.
pub struct WebDriverSession {
    transport: Arc<dyn HttpTransport>,
    base: String,
    closed: bool,
}

impl WebDriverSession {
    /// Creates a session and applies the implicit wait.
    pub async fn create(
        transport: Arc<dyn HttpTransport>,
        endpoint: &str,
        config: &WebDriverConfig,
    ) -> Result<Self, AutomationError> {
        let url = format!("{endpoint}/session");
        let response = transport
            .send(Method::POST, &url, Some(&config.capabilities()), HeaderMap::new())
            .await?;
        let value = decode_value(response).map_err(|e| AutomationError::Launch(e.to_string()))?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AutomationError::InvalidResponse("missing sessionId".to_string()))?;

        info!(session = %session_id, "WebDriver session started");
        let session = Self {
            transport,
            base: format!("{endpoint}/session/{session_id}"),
            closed: false,
        };

        let implicit = u64::try_from(config.implicit_wait.as_millis()).unwrap_or(u64::MAX);
        session
            .command(Method::POST, "/timeouts", Some(json!({ "implicit": implicit })))
            .await?;

        Ok(session)
    }

    /// Sends a session-scoped command and returns its `value`.
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, AutomationError> {
        let url = format!("{}{path}", self.base);
        debug!(method = %method, path = %path, "WebDriver command");
        let response = self
            .transport
            .send(method, &url, body.as_ref(), HeaderMap::new())
            .await?;
        decode_value(response)
    }

    fn element_path(element: &ElementRef, suffix: &str) -> String {
        format!("/element/{}{suffix}", element.as_str())
    }

    fn scoped_path(scope: Option<&ElementRef>, suffix: &str) -> String {
        match scope {
            Some(element) => Self::element_path(element, suffix),
            None => suffix.to_string(),
        }
    }
}

/// Extracts `value` from a WebDriver response, mapping error payloads.
fn decode_value(response: RawResponse) -> Result<Value, AutomationError> {
    let payload: Value = response
        .json()
        .map_err(|e| AutomationError::InvalidResponse(format!("{e}: {}", response.body)))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if response.is_success() {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if error == "no such element" {
        Err(AutomationError::ElementNotFound(message))
    } else {
        Err(AutomationError::WebDriver { error, message })
    }
}

fn parse_element(value: &Value) -> Result<ElementRef, AutomationError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(ElementRef::new)
        .ok_or_else(|| AutomationError::InvalidResponse(format!("not an element: {value}")))
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl AutomationSurface for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(drop)
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        let value = self.command(Method::GET, "/url", None).await?;
        value_to_string(value)
            .ok_or_else(|| AutomationError::InvalidResponse("empty URL".to_string()))
    }

    async fn refresh(&self) -> Result<(), AutomationError> {
        self.command(Method::POST, "/refresh", Some(json!({})))
            .await
            .map(drop)
    }

    async fn find(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<ElementRef, AutomationError> {
        let (using, value) = locator.to_webdriver();
        let path = Self::scoped_path(scope, "/element");
        let found = self
            .command(Method::POST, &path, Some(json!({ "using": using, "value": value })))
            .await
            .map_err(|e| match e {
                AutomationError::ElementNotFound(_) => {
                    AutomationError::ElementNotFound(locator.to_string())
                }
                other => other,
            })?;
        parse_element(&found)
    }

    async fn find_all(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, AutomationError> {
        let (using, value) = locator.to_webdriver();
        let path = Self::scoped_path(scope, "/elements");
        let found = self
            .command(Method::POST, &path, Some(json!({ "using": using, "value": value })))
            .await?;
        found
            .as_array()
            .ok_or_else(|| AutomationError::InvalidResponse("expected element list".to_string()))?
            .iter()
            .map(parse_element)
            .collect()
    }

    async fn click(&self, element: &ElementRef) -> Result<(), AutomationError> {
        let path = Self::element_path(element, "/click");
        self.command(Method::POST, &path, Some(json!({}))).await.map(drop)
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), AutomationError> {
        let path = Self::element_path(element, "/value");
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await
            .map(drop)
    }

    async fn text(&self, element: &ElementRef) -> Result<String, AutomationError> {
        let path = Self::element_path(element, "/text");
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value_to_string(value).unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        let path = Self::element_path(element, &format!("/attribute/{name}"));
        Ok(value_to_string(self.command(Method::GET, &path, None).await?))
    }

    async fn property(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        let path = Self::element_path(element, &format!("/property/{name}"));
        Ok(value_to_string(self.command(Method::GET, &path, None).await?))
    }

    async fn cookie(&self, name: &str) -> Result<Option<String>, AutomationError> {
        match self
            .command(Method::GET, &format!("/cookie/{name}"), None)
            .await
        {
            Ok(value) => Ok(value
                .get("value")
                .and_then(Value::as_str)
                .map(ToString::to_string)),
            Err(AutomationError::WebDriver { error, .. }) if error == "no such cookie" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn add_cookie(&self, cookie: &Cookie) -> Result<(), AutomationError> {
        let mut payload = json!({ "name": cookie.name, "value": cookie.value });
        if let Some(path) = &cookie.path {
            payload["path"] = json!(path);
        }
        self.command(Method::POST, "/cookie", Some(json!({ "cookie": payload })))
            .await
            .map(drop)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AutomationError> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| AutomationError::InvalidResponse("screenshot is not a string".into()))?;
        BASE64
            .decode(encoded)
            .map_err(|e| AutomationError::InvalidResponse(e.to_string()))
    }

    async fn quit(&mut self) -> Result<(), AutomationError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let response = self
            .transport
            .send(Method::DELETE, &self.base, None, HeaderMap::new())
            .await?;
        decode_value(response)?;
        info!("WebDriver session closed");
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(session = %self.base, "Dropping WebDriver session outside a runtime");
            return;
        };
        let transport = self.transport.clone();
        let url = self.base.clone();
        handle.spawn(async move {
            if let Err(e) = transport
                .send(Method::DELETE, &url, None, HeaderMap::new())
                .await
            {
                warn!(error = %e, "Failed to delete WebDriver session on drop");
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
