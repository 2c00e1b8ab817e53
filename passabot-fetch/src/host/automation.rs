//! Browser automation surface.
//!
//! [`AutomationSurface`] is the narrow set of browser operations the
//! interactive authenticator and the page source need. Sessions are owned
//! handles: whoever launches one is responsible for calling
//! [`AutomationSurface::quit`].

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::error::AutomationError;

/// Interval between URL checks while waiting for navigation.
const URL_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ============================================================================
// Locator
// ============================================================================

/// How to find an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// By `id` attribute.
    Id(String),
    /// By XPath expression.
    XPath(String),
    /// By CSS selector.
    Css(String),
    /// By tag name.
    Tag(String),
}

impl Locator {
    /// Creates an id locator.
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Creates an XPath locator.
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Creates a CSS locator.
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates a tag-name locator.
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    /// Returns the W3C `using` strategy and value.
    pub fn to_webdriver(&self) -> (&'static str, String) {
        match self {
            Self::Id(id) => ("css selector", format!("[id=\"{id}\"]")),
            Self::XPath(expr) => ("xpath", expr.clone()),
            Self::Css(selector) => ("css selector", selector.clone()),
            Self::Tag(name) => ("tag name", name.clone()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::XPath(expr) => write!(f, "xpath {expr}"),
            Self::Css(selector) => write!(f, "css {selector}"),
            Self::Tag(name) => write!(f, "<{name}>"),
        }
    }
}

// ============================================================================
// Element Reference & Cookie
// ============================================================================

/// Opaque handle to an element in the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    /// Creates a new element reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying element id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A browser cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Cookie path.
    pub path: Option<String>,
}

impl Cookie {
    /// Creates a new cookie scoped to the current document.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
        }
    }

    /// Sets the cookie path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

// ============================================================================
// Automation Surface Trait
// ============================================================================

/// A live browser session.
///
/// `find` and `find_all` search the whole page when `scope` is `None`, and
/// the subtree of the given element otherwise. `find` fails with
/// [`AutomationError::ElementNotFound`] once the implicit wait elapses.
#[async_trait]
pub trait AutomationSurface: Send + Sync {
    /// Navigates to a URL.
    async fn navigate(&self, url: &str) -> Result<(), AutomationError>;

    /// Returns the current URL.
    async fn current_url(&self) -> Result<String, AutomationError>;

    /// Reloads the current page.
    async fn refresh(&self) -> Result<(), AutomationError>;

    /// Finds a single element.
    async fn find(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<ElementRef, AutomationError>;

    /// Finds all matching elements (possibly none).
    async fn find_all(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, AutomationError>;

    /// Clicks an element.
    async fn click(&self, element: &ElementRef) -> Result<(), AutomationError>;

    /// Types text into an element.
    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), AutomationError>;

    /// Returns the rendered text of an element.
    async fn text(&self, element: &ElementRef) -> Result<String, AutomationError>;

    /// Returns an attribute value.
    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AutomationError>;

    /// Returns a DOM property value as a string.
    async fn property(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AutomationError>;

    /// Returns the value of a cookie, if set.
    async fn cookie(&self, name: &str) -> Result<Option<String>, AutomationError>;

    /// Adds a cookie to the current document.
    async fn add_cookie(&self, cookie: &Cookie) -> Result<(), AutomationError>;

    /// Captures a PNG screenshot of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, AutomationError>;

    /// Ends the session. Calling it twice is a no-op.
    async fn quit(&mut self) -> Result<(), AutomationError>;

    /// Finds an element and clicks it.
    async fn click_on(&self, locator: &Locator) -> Result<(), AutomationError> {
        let element = self.find(None, locator).await?;
        self.click(&element).await
    }
}

/// Starts new automation sessions.
#[async_trait]
pub trait AutomationLauncher: Send + Sync {
    /// Launches a fresh session.
    async fn launch(&self) -> Result<Box<dyn AutomationSurface>, AutomationError>;
}

// ============================================================================
// Helpers
// ============================================================================

/// Waits until the current URL differs from `from`.
///
/// Returns the new URL, or [`AutomationError::Timeout`] if it did not change
/// within `timeout`.
pub async fn wait_until_url_changes(
    surface: &dyn AutomationSurface,
    from: &str,
    timeout: Duration,
) -> Result<String, AutomationError> {
    let deadline = Instant::now() + timeout;
    loop {
        let current = surface.current_url().await?;
        if current != from {
            debug!(url = %current, "URL changed");
            return Ok(current);
        }
        if Instant::now() >= deadline {
            return Err(AutomationError::Timeout(format!("URL to change from {from}")));
        }
        tokio::time::sleep(URL_POLL_INTERVAL).await;
    }
}

/// Picks the `<option>` of a `<select>` whose visible text equals `text`.
pub async fn select_by_visible_text(
    surface: &dyn AutomationSurface,
    select: &ElementRef,
    text: &str,
) -> Result<(), AutomationError> {
    let option = surface
        .find(
            Some(select),
            &Locator::xpath(format!(".//option[normalize-space(.)=\"{text}\"]")),
        )
        .await?;
    surface.click(&option).await
}

// ============================================================================
// Tests
// ============================================================================
