//! Session lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the data source currently holds a usable authenticated session.
///
/// There is no terminal state: a session moves back and forth between the
/// two variants for the whole lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// A credential bundle is installed and believed valid.
    LoggedIn,
    /// No usable session; the next cycle must authenticate first.
    #[default]
    LoggedOut,
}

impl SessionState {
    /// Returns true if the session is usable.
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn)
    }

    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LoggedIn => "logged in",
            Self::LoggedOut => "logged out",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
