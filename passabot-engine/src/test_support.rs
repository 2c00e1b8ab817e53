//! Fakes for the engine's capability traits.

use async_trait::async_trait;
use passabot_core::{AuthMode, AvailabilityRecord, CredentialBundle, SourceKind};
use passabot_fetch::{
    AutomationError, Authenticator, AvailabilitySource, FetchError, HttpError, HttpTransport,
    RawResponse, Shutdown,
};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::notify::{Channel, Message, NotificationSink, NotifyError};

// ============================================================================
// Recording Sink
// ============================================================================

/// Sink that keeps every delivered message.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(Channel, Message)>>,
    failures: AtomicUsize,
    attempts: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the next `n` sends fail.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<(Channel, Message)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn on(&self, channel: Channel) -> Vec<Message> {
        self.messages()
            .into_iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m)
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, channel: Channel, message: &Message) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NotifyError::Rejected {
                status: 502,
                description: "Bad Gateway".to_string(),
            });
        }
        self.messages
            .lock()
            .unwrap()
            .push((channel, message.clone()));
        Ok(())
    }
}

// ============================================================================
// Recording Transport
// ============================================================================

/// Transport that answers every request with the same response.
pub struct RecordingTransport {
    reply: RawResponse,
    requests: Mutex<Vec<(String, Value)>>,
}

impl RecordingTransport {
    pub fn replying(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: RawResponse::new(status, "https://telegram.test", body),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(
        &self,
        _method: Method,
        url: &str,
        body: Option<&Value>,
        _headers: HeaderMap,
    ) -> Result<RawResponse, HttpError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), body.cloned().unwrap_or(Value::Null)));
        Ok(self.reply.clone())
    }
}

// ============================================================================
// Fake Authenticator
// ============================================================================

type ErrorFactory = Box<dyn Fn() -> AutomationError + Send + Sync>;

/// Authenticator that counts its calls.
#[derive(Default)]
pub struct FakeAuthenticator {
    failure: Mutex<Option<ErrorFactory>>,
    calls: AtomicUsize,
    gate: Option<Shutdown>,
    released: AtomicBool,
}

impl FakeAuthenticator {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(factory: impl Fn() -> AutomationError + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            failure: Mutex::new(Some(Box::new(factory))),
            ..Self::default()
        })
    }

    /// Holds every call until `shutdown` fires, then releases and fails
    /// with `Cancelled`, like a login waiting for user confirmation.
    pub fn waiting_for(shutdown: Shutdown) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(shutdown),
            ..Self::default()
        })
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Lets subsequent calls succeed.
    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    fn id(&self) -> &str {
        "fake"
    }

    fn mode(&self) -> AuthMode {
        AuthMode::Manual
    }

    async fn acquire_session(&self) -> Result<CredentialBundle, AutomationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(shutdown) = &self.gate {
            shutdown.wait().await;
            self.released.store(true, Ordering::SeqCst);
            return Err(AutomationError::Cancelled);
        }
        if let Some(factory) = self.failure.lock().unwrap().as_ref() {
            return Err(factory());
        }
        Ok(CredentialBundle::new(format!("csrf-{n}"), format!("session-{n}")))
    }
}

// ============================================================================
// Fake Source
// ============================================================================

#[derive(Default)]
struct SourceState {
    script: VecDeque<Result<Vec<AvailabilityRecord>, FetchError>>,
    refuse_login: bool,
    bundles: Vec<CredentialBundle>,
    fetches: usize,
    closed: bool,
}

/// Scripted source. Clones share state. Returns an empty list once the
/// script runs out.
#[derive(Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<SourceState>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut SourceState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn push_records(&self, records: Vec<AvailabilityRecord>) {
        self.with(|s| s.script.push_back(Ok(records)));
    }

    pub fn push_error(&self, err: FetchError) {
        self.with(|s| s.script.push_back(Err(err)));
    }

    pub fn refuse_login(&self) {
        self.with(|s| s.refuse_login = true);
    }

    pub fn logins(&self) -> usize {
        self.with(|s| s.bundles.len())
    }

    pub fn last_bundle(&self) -> Option<CredentialBundle> {
        self.with(|s| s.bundles.last().cloned())
    }

    pub fn fetches(&self) -> usize {
        self.with(|s| s.fetches)
    }

    pub fn is_closed(&self) -> bool {
        self.with(|s| s.closed)
    }
}

#[async_trait]
impl AvailabilitySource for FakeSource {
    fn id(&self) -> &str {
        "fake"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    async fn login(&mut self, bundle: CredentialBundle) -> Result<bool, FetchError> {
        Ok(self.with(|s| {
            s.bundles.push(bundle);
            !s.refuse_login
        }))
    }

    async fn fetch(&mut self) -> Result<Vec<AvailabilityRecord>, FetchError> {
        self.with(|s| {
            s.fetches += 1;
            s.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        })
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        self.with(|s| s.closed = true);
        Ok(())
    }
}
