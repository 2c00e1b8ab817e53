//! Fakes for the host traits.

use async_trait::async_trait;
use passabot_fetch::{
    AutomationError, AutomationLauncher, AutomationSurface, Cookie, ElementRef, HttpError,
    HttpTransport, Locator, RawResponse,
};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Fake Browser
// ============================================================================

#[derive(Default)]
struct BrowserState {
    url: String,
    elements: HashMap<String, Vec<String>>,
    misses: HashMap<String, u32>,
    texts: HashMap<String, String>,
    attributes: HashMap<(String, String), String>,
    properties: HashMap<(String, String), String>,
    cookies: HashMap<String, String>,
    click_targets: HashMap<String, String>,
    refresh_target: Option<String>,
    log: Vec<String>,
    quit: bool,
}

/// Scripted browser. Clones share state, so a test can keep a handle after
/// boxing one into a source.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<BrowserState>>,
}

fn key(scope: Option<&str>, locator: &Locator) -> String {
    format!("{}|{locator}", scope.unwrap_or_default())
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut BrowserState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn add(&self, scope: Option<&str>, locator: &Locator, ids: &[&str]) {
        let ids = ids.iter().map(ToString::to_string).collect();
        self.with(|s| s.elements.insert(key(scope, locator), ids));
    }

    pub fn remove(&self, scope: Option<&str>, locator: &Locator) {
        self.with(|s| s.elements.remove(&key(scope, locator)));
    }

    /// The next `count` lookups of `locator` fail.
    pub fn miss(&self, locator: &Locator, count: u32) {
        self.with(|s| s.misses.insert(key(None, locator), count));
    }

    pub fn set_text(&self, id: &str, text: &str) {
        self.with(|s| s.texts.insert(id.to_string(), text.to_string()));
    }

    pub fn set_attribute(&self, id: &str, name: &str, value: &str) {
        self.with(|s| {
            s.attributes
                .insert((id.to_string(), name.to_string()), value.to_string())
        });
    }

    pub fn set_property(&self, id: &str, name: &str, value: &str) {
        self.with(|s| {
            s.properties
                .insert((id.to_string(), name.to_string()), value.to_string())
        });
    }

    pub fn set_cookie(&self, name: &str, value: &str) {
        self.with(|s| s.cookies.insert(name.to_string(), value.to_string()));
    }

    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.with(|s| s.cookies.get(name).cloned())
    }

    pub fn clear_cookies(&self) {
        self.with(|s| s.cookies.clear());
    }

    pub fn navigate_on_click(&self, id: &str, url: &str) {
        self.with(|s| s.click_targets.insert(id.to_string(), url.to_string()));
    }

    pub fn navigate_on_refresh(&self, url: &str) {
        self.with(|s| s.refresh_target = Some(url.to_string()));
    }

    pub fn log(&self) -> Vec<String> {
        self.with(|s| s.log.clone())
    }

    pub fn is_quit(&self) -> bool {
        self.with(|s| s.quit)
    }

    /// Installs a location table with one `tr` per row.
    pub fn install_table(&self, table_xpath: &str, rows: &[([&str; 5], Option<&str>)]) {
        let table = Locator::xpath(table_xpath);
        self.add(None, &table, &["table"]);
        let row_ids: Vec<String> = (0..rows.len()).map(|i| format!("row{i}")).collect();
        let row_refs: Vec<&str> = row_ids.iter().map(String::as_str).collect();
        self.add(Some("table"), &Locator::tag("tr"), &row_refs);

        for (i, (cells, info)) in rows.iter().enumerate() {
            let cell_ids: Vec<String> = (0..cells.len()).map(|c| format!("row{i}-td{c}")).collect();
            let cell_refs: Vec<&str> = cell_ids.iter().map(String::as_str).collect();
            self.add(Some(&row_ids[i]), &Locator::tag("td"), &cell_refs);
            for (id, text) in cell_ids.iter().zip(cells.iter()) {
                self.set_text(id, text);
            }
            if let Some(info) = info {
                self.set_property(&cell_ids[4], "title", info);
            }
        }
    }
}

#[async_trait]
impl AutomationSurface for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        self.with(|s| {
            s.url = url.to_string();
            s.log.push(format!("navigate {url}"));
        });
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        Ok(self.with(|s| s.url.clone()))
    }

    async fn refresh(&self) -> Result<(), AutomationError> {
        self.with(|s| {
            s.log.push("refresh".to_string());
            if let Some(url) = s.refresh_target.clone() {
                s.url = url;
            }
        });
        Ok(())
    }

    async fn find(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<ElementRef, AutomationError> {
        let k = key(scope.map(ElementRef::as_str), locator);
        self.with(|s| {
            if let Some(remaining) = s.misses.get_mut(&k) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(AutomationError::ElementNotFound(locator.to_string()));
                }
            }
            s.elements
                .get(&k)
                .and_then(|ids| ids.first())
                .map(ElementRef::new)
                .ok_or_else(|| AutomationError::ElementNotFound(locator.to_string()))
        })
    }

    async fn find_all(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, AutomationError> {
        let k = key(scope.map(ElementRef::as_str), locator);
        Ok(self.with(|s| {
            s.elements
                .get(&k)
                .map(|ids| ids.iter().map(ElementRef::new).collect())
                .unwrap_or_default()
        }))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.with(|s| {
            s.log.push(format!("click {}", element.as_str()));
            if let Some(url) = s.click_targets.get(element.as_str()).cloned() {
                s.url = url;
            }
        });
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), AutomationError> {
        self.with(|s| s.log.push(format!("type {} {text}", element.as_str())));
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String, AutomationError> {
        Ok(self.with(|s| s.texts.get(element.as_str()).cloned().unwrap_or_default()))
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        let k = (element.as_str().to_string(), name.to_string());
        Ok(self.with(|s| s.attributes.get(&k).cloned()))
    }

    async fn property(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        let k = (element.as_str().to_string(), name.to_string());
        Ok(self.with(|s| s.properties.get(&k).cloned()))
    }

    async fn cookie(&self, name: &str) -> Result<Option<String>, AutomationError> {
        Ok(self.cookie_value(name))
    }

    async fn add_cookie(&self, cookie: &Cookie) -> Result<(), AutomationError> {
        self.with(|s| {
            s.log.push(format!("cookie {}", cookie.name));
            s.cookies.insert(cookie.name.clone(), cookie.value.clone());
        });
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AutomationError> {
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn quit(&mut self) -> Result<(), AutomationError> {
        self.with(|s| s.quit = true);
        Ok(())
    }
}

/// Launcher handing out sessions on one shared fake browser.
pub struct FakeLauncher {
    browser: FakeBrowser,
    launches: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(browser: FakeBrowser) -> Self {
        Self {
            browser,
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AutomationLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn AutomationSurface>, AutomationError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.browser.clone()))
    }
}

// ============================================================================
// Fake Portal
// ============================================================================

/// A recorded request.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub url: String,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

/// Transport answering by URL suffix.
#[derive(Default)]
pub struct FakePortal {
    routes: Mutex<Vec<(String, RawResponse)>>,
    sent: Mutex<Vec<SentRequest>>,
}

impl FakePortal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Responds to URLs ending with `suffix` and whose body contains
    /// `needle` (empty matches all).
    pub fn route(&self, suffix: &str, needle: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().push((
            format!("{suffix}#{needle}"),
            RawResponse::new(status, suffix, body).with_header("content-type", "application/json"),
        ));
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakePortal {
    async fn send(
        &self,
        _method: Method,
        url: &str,
        body: Option<&Value>,
        headers: HeaderMap,
    ) -> Result<RawResponse, HttpError> {
        self.sent.lock().unwrap().push(SentRequest {
            url: url.to_string(),
            body: body.cloned(),
            headers,
        });
        let body_text = body.map(Value::to_string).unwrap_or_default();
        let routes = self.routes.lock().unwrap();
        routes
            .iter()
            .find(|(k, _)| {
                let (suffix, needle) = k.split_once('#').unwrap_or((k.as_str(), ""));
                url.ends_with(suffix) && body_text.contains(needle)
            })
            .map(|(_, r)| r.clone())
            .ok_or_else(|| HttpError::InvalidUrl(format!("no route for {url}")))
    }
}
