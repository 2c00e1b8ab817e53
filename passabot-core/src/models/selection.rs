//! Start-up selection of the data source and authenticator variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Source Kind
// ============================================================================

/// Which availability source to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Authenticated JSON API calls.
    #[default]
    Api,
    /// Table scraped from a page rendered in a live browser session.
    Page,
}

impl SourceKind {
    /// Returns the identifier used in settings and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Page => "page",
        }
    }

    /// Returns true if this source needs a browser session while polling.
    pub fn needs_browser(&self) -> bool {
        matches!(self, Self::Page)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "page" | "selenium" | "browser" => Ok(Self::Page),
            _ => Err(CoreError::InvalidValue {
                field: "source",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Auth Mode
// ============================================================================

/// Which authenticator produces credential bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Drive the SPID login ceremony in a browser.
    #[default]
    Interactive,
    /// Use an operator-supplied CSRF token and session id.
    Manual,
}

impl AuthMode {
    /// Returns the identifier used in settings and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interactive" | "spid" => Ok(Self::Interactive),
            "manual" => Ok(Self::Manual),
            _ => Err(CoreError::InvalidValue {
                field: "auth",
                value: s.to_string(),
            }),
        }
    }
}
