//! Session lifecycle.
//!
//! ```text
//!            acquire + login ok
//!  LoggedOut ------------------> LoggedIn
//!      ^                            |
//!      +------- invalidate() -------+
//! ```

use passabot_core::SessionState;
use passabot_fetch::{Authenticator, AvailabilitySource};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::EngineError;

/// Keeps a data source logged in.
pub struct SessionManager {
    authenticator: Arc<dyn Authenticator>,
    state: SessionState,
}

impl SessionManager {
    /// Creates a manager in the given initial state.
    pub fn new(authenticator: Arc<dyn Authenticator>, initial: SessionState) -> Self {
        Self {
            authenticator,
            state: initial,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Logs `source` in unless the session is already live.
    ///
    /// Returns `Ok(false)` when a page element needed for the login never
    /// appeared; the state stays `LoggedOut` and the caller is expected to
    /// back off. Every other failure is returned as an error.
    #[instrument(skip(self, source), fields(source = source.id(), auth = self.authenticator.id()))]
    pub async fn ensure_logged_in(
        &mut self,
        source: &mut dyn AvailabilitySource,
    ) -> Result<bool, EngineError> {
        if self.state.is_logged_in() {
            return Ok(true);
        }

        let bundle = match self.authenticator.acquire_session().await {
            Ok(bundle) => bundle,
            Err(e) if e.is_element_not_found() => {
                warn!(error = %e, "Login ceremony could not complete");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if source.login(bundle).await? {
            self.state = SessionState::LoggedIn;
            info!("Logged in");
            Ok(true)
        } else {
            warn!("Source rejected the session");
            Ok(false)
        }
    }

    /// Forces re-authentication on the next cycle.
    pub fn invalidate(&mut self) {
        if self.state.is_logged_in() {
            info!("Session invalidated");
        }
        self.state = SessionState::LoggedOut;
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("authenticator", &self.authenticator.id())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeAuthenticator, FakeSource};
    use passabot_fetch::AutomationError;

    #[tokio::test]
    async fn test_logged_in_never_calls_authenticator() {
        let auth = FakeAuthenticator::succeeding();
        let mut source = FakeSource::new();
        let mut session = SessionManager::new(auth.clone(), SessionState::LoggedIn);

        assert!(session.ensure_logged_in(&mut source).await.unwrap());
        assert!(session.ensure_logged_in(&mut source).await.unwrap());

        assert_eq!(auth.calls(), 0);
        assert_eq!(source.logins(), 0);
    }

    #[tokio::test]
    async fn test_logged_out_acquires_and_logs_in() {
        let auth = FakeAuthenticator::succeeding();
        let mut source = FakeSource::new();
        let mut session = SessionManager::new(auth.clone(), SessionState::LoggedOut);

        assert!(session.ensure_logged_in(&mut source).await.unwrap());

        assert_eq!(session.state(), SessionState::LoggedIn);
        assert_eq!(auth.calls(), 1);
        assert_eq!(source.logins(), 1);
    }

    #[tokio::test]
    async fn test_element_not_found_is_soft_failure() {
        let auth = FakeAuthenticator::failing(|| {
            AutomationError::ElementNotFound("#username".to_string())
        });
        let mut source = FakeSource::new();
        let mut session = SessionManager::new(auth.clone(), SessionState::LoggedOut);

        assert!(!session.ensure_logged_in(&mut source).await.unwrap());

        assert_eq!(session.state(), SessionState::LoggedOut);
        assert_eq!(source.logins(), 0);
    }

    #[tokio::test]
    async fn test_other_automation_errors_propagate() {
        let auth = FakeAuthenticator::failing(|| AutomationError::Launch("no driver".to_string()));
        let mut source = FakeSource::new();
        let mut session = SessionManager::new(auth, SessionState::LoggedOut);

        let err = session.ensure_logged_in(&mut source).await.unwrap_err();
        assert!(matches!(err, EngineError::Automation(_)));
        assert_eq!(session.state(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn test_source_refusing_login_stays_logged_out() {
        let auth = FakeAuthenticator::succeeding();
        let mut source = FakeSource::new();
        source.refuse_login();
        let mut session = SessionManager::new(auth, SessionState::LoggedOut);

        assert!(!session.ensure_logged_in(&mut source).await.unwrap());
        assert_eq!(session.state(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_login() {
        let auth = FakeAuthenticator::succeeding();
        let mut source = FakeSource::new();
        let mut session = SessionManager::new(auth.clone(), SessionState::LoggedIn);

        session.invalidate();
        assert_eq!(session.state(), SessionState::LoggedOut);

        session.ensure_logged_in(&mut source).await.unwrap();
        assert_eq!(auth.calls(), 1);
    }
}
