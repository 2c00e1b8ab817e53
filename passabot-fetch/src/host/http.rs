//! HTTP transport with tracing and domain allowlist.
//!
//! Every outbound request in passabot goes through [`HttpTransport`], which
//! returns the whole response as a [`RawResponse`]. Status handling is left
//! to the caller so that non-success bodies can be kept for diagnostics.

use async_trait::async_trait;
use reqwest::{Client, Method, header::HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{HttpError, UpstreamError};

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for passabot.
const USER_AGENT: &str = concat!("passabot/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Raw Response
// ============================================================================

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    /// Response headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    /// Creates a new response with no headers.
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Converts the response into an [`UpstreamError`].
    pub fn into_upstream_error(self) -> UpstreamError {
        UpstreamError {
            status: self.status,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

// ============================================================================
// HTTP Transport Trait
// ============================================================================

/// Sends HTTP requests and returns fully-read responses.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request with an optional JSON body.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: HeaderMap,
    ) -> Result<RawResponse, HttpError>;

    /// Sends a POST request with a JSON body.
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        headers: HeaderMap,
    ) -> Result<RawResponse, HttpError> {
        self.send(Method::POST, url, Some(body), headers).await
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// reqwest-backed transport with tracing and domain allowlist.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    allowed_domains: Option<Vec<String>>,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner: client,
            allowed_domains: None,
        })
    }

    /// Restricts requests to the given domains and their subdomains.
    #[must_use]
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Checks if a URL's domain is allowed.
    fn is_domain_allowed(&self, url: &str) -> Result<(), HttpError> {
        let Some(ref allowed) = self.allowed_domains else {
            return Ok(());
        };

        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("No host in URL".to_string()))?;

        let allowed = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

        if allowed {
            Ok(())
        } else {
            Err(HttpError::DomainNotAllowed(host.to_string()))
        }
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    #[instrument(skip(self, body, headers), fields(method = %method, url = %url))]
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: HeaderMap,
    ) -> Result<RawResponse, HttpError> {
        self.is_domain_allowed(url)?;
        debug!("Sending request");

        let mut request = self.inner.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(HttpError::from_reqwest)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(HttpError::from_reqwest)?;

        debug!(status = status, body_len = body.len(), "Response received");

        Ok(RawResponse {
            status,
            url: final_url,
            headers,
            body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_allowlist() {
        let client = HttpClient::new()
            .unwrap()
            .with_allowed_domains(vec!["poliziadistato.it".to_string()]);

        assert!(
            client
                .is_domain_allowed("https://passaportonline.poliziadistato.it/cittadino/")
                .is_ok()
        );
        assert!(client.is_domain_allowed("https://poliziadistato.it").is_ok());
        assert!(client.is_domain_allowed("https://evil.com/steal").is_err());
        assert!(client.is_domain_allowed("https://notpoliziadistato.it").is_err());
    }

    #[test]
    fn test_no_domain_restrictions() {
        let client = HttpClient::new().unwrap();

        assert!(client.is_domain_allowed("http://127.0.0.1:9515/session").is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = HttpClient::new()
            .unwrap()
            .with_allowed_domains(vec!["example.com".to_string()]);

        assert!(matches!(
            client.is_domain_allowed("not-a-valid-url"),
            Err(HttpError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_raw_response() {
        let response = RawResponse::new(200, "https://example.com", r#"{"a":1}"#);
        assert!(response.is_success());
        let value: Value = response.json().unwrap();
        assert_eq!(value["a"], 1);

        let failed = RawResponse::new(403, "https://example.com/x", "denied")
            .with_header("server", "nginx");
        assert!(!failed.is_success());
        let upstream = failed.into_upstream_error();
        assert_eq!(upstream.status, 403);
        assert_eq!(upstream.body, "denied");
        assert_eq!(upstream.headers_text(), "server: nginx");
    }
}
