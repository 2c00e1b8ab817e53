//! The poll loop.
//!
//! One cycle: make sure the session is live, fetch, then either report the
//! records or handle the failure. Session-invalidating failures flip the
//! session to `LoggedOut`; malformed responses leave it alone. Anything
//! else ends the loop with an [`EngineError`].

use passabot_core::AvailabilityRecord;
use passabot_core::html::escape;
use passabot_fetch::{AvailabilitySource, ErrorClass, FetchError, Shutdown, UpstreamError};
use passabot_store::{DiagnosticStore, Settings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::error::EngineError;
use crate::notify::{Channel, Message, NotificationSink};
use crate::session::SessionManager;
use crate::throttle::{Delivery, NotificationThrottle};

/// Control notice sent when a response cannot be interpreted.
const MALFORMED_NOTICE: &str = "Could not decode the server response, retrying...";

// ============================================================================
// Settings
// ============================================================================

/// Timing and throttling parameters of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait between cycles.
    pub poll_interval: Duration,
    /// Wait after a failed login.
    pub login_backoff: Duration,
    /// Streak length after which reports go silent.
    pub silence_threshold: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            login_backoff: Duration::from_secs(300),
            silence_threshold: crate::throttle::DEFAULT_SILENCE_THRESHOLD,
        }
    }
}

impl From<&Settings> for PollSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            login_backoff: settings.login_backoff(),
            silence_threshold: settings.silence_threshold,
        }
    }
}

// ============================================================================
// Cycle Outcome
// ============================================================================

/// What happened in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The login failed; the long backoff follows.
    LoginFailed,
    /// Records were sent to the data channel.
    Reported {
        /// Number of records sent.
        records: usize,
        /// Whether they were sent silently.
        silent: bool,
    },
    /// The fetch succeeded but nothing was available.
    NothingAvailable,
    /// The session was dropped after a fetch failure.
    SessionInvalidated,
    /// The response could not be interpreted.
    MalformedResponse,
}

impl CycleOutcome {
    /// Returns true when the login backoff applies.
    pub fn is_login_failure(&self) -> bool {
        matches!(self, Self::LoginFailed)
    }
}

// ============================================================================
// Poll Loop
// ============================================================================

/// Drives a data source on a fixed interval.
pub struct PollLoop {
    source: Box<dyn AvailabilitySource>,
    session: SessionManager,
    throttle: NotificationThrottle,
    sink: Arc<dyn NotificationSink>,
    diagnostics: DiagnosticStore,
    settings: PollSettings,
}

impl PollLoop {
    /// Creates a poll loop.
    pub fn new(
        source: Box<dyn AvailabilitySource>,
        session: SessionManager,
        sink: Arc<dyn NotificationSink>,
        diagnostics: DiagnosticStore,
        settings: PollSettings,
    ) -> Self {
        let throttle = NotificationThrottle::new(settings.silence_threshold);
        Self {
            source,
            session,
            throttle,
            sink,
            diagnostics,
            settings,
        }
    }

    /// The session manager.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The notification throttle.
    pub fn throttle(&self) -> &NotificationThrottle {
        &self.throttle
    }

    /// Logs in if needed. Used once at start-up before the loop runs.
    pub async fn login(&mut self) -> Result<bool, EngineError> {
        self.session.ensure_logged_in(self.source.as_mut()).await
    }

    /// Runs one cycle.
    #[instrument(skip(self), fields(source = self.source.id()))]
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, EngineError> {
        if !self.session.state().is_logged_in() && !self.login().await? {
            let notice = format!(
                "Could not login, retrying in {}...",
                describe_wait(self.settings.login_backoff)
            );
            error!(
                backoff_secs = self.settings.login_backoff.as_secs(),
                "Could not login"
            );
            self.sink
                .send(Channel::Control, &Message::plain(notice))
                .await?;
            return Ok(CycleOutcome::LoginFailed);
        }

        match self.source.fetch().await {
            Ok(records) => self.report(records).await,
            Err(e) => self.handle_fetch_error(e).await,
        }
    }

    /// Wait that follows an outcome.
    pub fn delay_after(&self, outcome: &CycleOutcome) -> Duration {
        if outcome.is_login_failure() {
            self.settings.login_backoff
        } else {
            self.settings.poll_interval
        }
    }

    /// Runs cycles until one fails fatally or `shutdown` fires.
    ///
    /// A cycle in progress is never abandoned midway: shutdown is observed
    /// between cycles, during the wait, and by the authenticator itself.
    /// Errors raised after shutdown was requested are not fatal.
    pub async fn run(&mut self, shutdown: &Shutdown) -> Result<(), EngineError> {
        info!(
            interval_secs = self.settings.poll_interval.as_secs(),
            "Starting poll loop"
        );
        while !shutdown.is_triggered() {
            let outcome = match self.run_cycle().await {
                Ok(outcome) => outcome,
                Err(e) if shutdown.is_triggered() => {
                    debug!(error = %e, "Cycle interrupted by shutdown");
                    break;
                }
                Err(e) => return Err(e),
            };
            let delay = self.delay_after(&outcome);
            debug!(?outcome, delay_secs = delay.as_secs(), "Cycle finished");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = shutdown.wait() => break,
            }
        }
        info!("Poll loop stopped");
        Ok(())
    }

    /// Releases the source.
    pub async fn close(&mut self) -> Result<(), EngineError> {
        self.source.close().await?;
        Ok(())
    }

    async fn report(&mut self, records: Vec<AvailabilityRecord>) -> Result<CycleOutcome, EngineError> {
        // Sources already filter; this keeps the guarantee independent of them.
        let records = AvailabilityRecord::retain_eligible(records);

        let delivery = self.throttle.observe(records.len());
        if delivery == Delivery::Nothing {
            debug!("No availability");
            return Ok(CycleOutcome::NothingAvailable);
        }

        let silent = delivery.is_silent();
        info!(
            count = records.len(),
            streak = self.throttle.streak(),
            silent,
            "Reporting availability"
        );
        for record in &records {
            let message = Message::html(record.to_html()).silent(silent);
            self.sink.send(Channel::Data, &message).await?;
        }

        Ok(CycleOutcome::Reported {
            records: records.len(),
            silent,
        })
    }

    async fn handle_fetch_error(&mut self, err: FetchError) -> Result<CycleOutcome, EngineError> {
        match err.class() {
            ErrorClass::SessionInvalidating => {
                warn!(error = %err, "Fetch failed, dropping session");
                let notice = match err.upstream() {
                    Some(upstream) => self.upstream_notice(upstream).await,
                    None => Message::plain(format!("{err}, logging in again...")),
                };
                self.session.invalidate();
                self.sink.send(Channel::Control, &notice).await?;
                Ok(CycleOutcome::SessionInvalidated)
            }
            ErrorClass::Transient => {
                warn!(error = %err, "Could not interpret the response");
                self.sink
                    .send(Channel::Control, &Message::plain(MALFORMED_NOTICE))
                    .await?;
                Ok(CycleOutcome::MalformedResponse)
            }
            ErrorClass::Fatal => Err(err.into()),
        }
    }

    async fn upstream_notice(&self, upstream: &UpstreamError) -> Message {
        let saved = match self.diagnostics.write_upstream_body(&upstream.body).await {
            Ok(path) => format!(
                "Response body saved to <code>{}</code>",
                escape(&path.display().to_string())
            ),
            Err(e) => {
                warn!(error = %e, "Could not save the response body");
                format!("Response body could not be saved: {}", escape(&e.to_string()))
            }
        };

        Message::html(format!(
            "{}\n\n<pre>{}</pre>\n\n{saved}",
            escape(&upstream.to_string()),
            escape(&upstream.headers_text()),
        ))
    }
}

/// Formats a wait for operator notices ("5 minutes", "90 seconds").
fn describe_wait(wait: Duration) -> String {
    let secs = wait.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{s} seconds"),
    }
}
