//! Credentials produced and consumed by authentication.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Credential Bundle
// ============================================================================

/// The pair of tokens that authenticates requests against the portal.
///
/// Produced once per successful authentication and handed to the data
/// source, which stamps it onto every subsequent request. A bundle is never
/// mutated; re-authentication replaces it wholesale.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    /// Value of the `_csrf` meta tag, sent as the `X-Csrf-Token` header.
    pub csrf_token: String,
    /// Value of the `JSESSIONID` cookie.
    pub session_token: String,
}

impl CredentialBundle {
    /// Creates a new credential bundle.
    pub fn new(csrf_token: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            csrf_token: csrf_token.into(),
            session_token: session_token.into(),
        }
    }

    /// Returns true if either token is empty.
    pub fn is_incomplete(&self) -> bool {
        self.csrf_token.trim().is_empty() || self.session_token.trim().is_empty()
    }

    /// Formats the session token as a `Cookie` header value.
    pub fn cookie_header(&self) -> String {
        format!("JSESSIONID={}", self.session_token)
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("csrf_token", &redact(&self.csrf_token))
            .field("session_token", &redact(&self.session_token))
            .finish()
    }
}

// ============================================================================
// Login Credentials
// ============================================================================

/// Username and password for the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    /// Identity provider username.
    pub username: String,
    /// Identity provider password.
    pub password: String,
}

impl LoginCredentials {
    /// Creates new login credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Keeps the first four characters of a secret.
fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}***")
}
