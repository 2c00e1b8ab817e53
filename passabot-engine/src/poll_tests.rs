//! Poll loop behaviour tests.
//!
//! Most tests drive `run_cycle` directly against scripted fakes; the
//! shutdown tests run the whole loop.

use chrono::NaiveDate;
use passabot_core::{AvailabilityRecord, RecordDetail, SessionState};
use passabot_fetch::{AutomationError, FetchError, HttpError, UpstreamError, shutdown_channel};
use passabot_store::DiagnosticStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::error::EngineError;
use crate::notify::{Channel, MessageFormat};
use crate::poll::{CycleOutcome, PollLoop, PollSettings};
use crate::session::SessionManager;
use crate::test_support::{FakeAuthenticator, FakeSource, RecordingSink};

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    poll: PollLoop,
    source: FakeSource,
    auth: Arc<FakeAuthenticator>,
    sink: Arc<RecordingSink>,
    diagnostics: TempDir,
}

fn harness_with(auth: Arc<FakeAuthenticator>, initial: SessionState) -> Harness {
    let source = FakeSource::new();
    let sink = RecordingSink::new();
    let diagnostics = TempDir::new().unwrap();
    let poll = PollLoop::new(
        Box::new(source.clone()),
        SessionManager::new(auth.clone(), initial),
        sink.clone(),
        DiagnosticStore::new(diagnostics.path()),
        PollSettings::default(),
    );
    Harness {
        poll,
        source,
        auth,
        sink,
        diagnostics,
    }
}

fn harness() -> Harness {
    harness_with(FakeAuthenticator::succeeding(), SessionState::LoggedIn)
}

fn available(location: &str) -> AvailabilityRecord {
    AvailabilityRecord::new(
        location,
        "Via Roma 1",
        NaiveDate::from_ymd_opt(2026, 11, 3),
        RecordDetail::Info("Solo residenti".to_string()),
    )
}

fn unavailable(location: &str) -> AvailabilityRecord {
    AvailabilityRecord::new(
        location,
        "Via Milano 2",
        None,
        RecordDetail::Info("La sede non offre al momento disponibilità".to_string()),
    )
}

fn upstream(status: u16) -> FetchError {
    FetchError::Upstream(UpstreamError {
        status,
        url: "https://portal.test/elenca-sede".to_string(),
        headers: vec![("content-type".to_string(), "text/html".to_string())],
        body: "<html>Access denied</html>".to_string(),
    })
}

// ============================================================================
// Reporting
// ============================================================================

#[tokio::test]
async fn test_records_without_date_never_reach_sink() {
    let mut h = harness();
    h.source
        .push_records(vec![unavailable("Questura di Torino"), available("Moncalieri")]);

    let outcome = h.poll.run_cycle().await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Reported {
            records: 1,
            silent: false
        }
    );
    let data = h.sink.on(Channel::Data);
    assert_eq!(data.len(), 1);
    assert!(data[0].text.contains("Moncalieri"));
    assert!(!data[0].text.contains("Torino"));
    assert_eq!(data[0].format, MessageFormat::Html);
}

#[tokio::test]
async fn test_only_undated_records_count_as_empty() {
    let mut h = harness();
    h.source.push_records(vec![available("A")]);
    h.source.push_records(vec![unavailable("B")]);

    h.poll.run_cycle().await.unwrap();
    assert_eq!(h.poll.throttle().streak(), 1);

    let outcome = h.poll.run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::NothingAvailable);
    assert_eq!(h.poll.throttle().streak(), 0);
    assert_eq!(h.sink.on(Channel::Data).len(), 1);
}

#[tokio::test]
async fn test_streak_silences_after_twenty_cycles() {
    let mut h = harness();
    for _ in 0..20 {
        h.source.push_records(vec![available("A"), available("B")]);
    }
    h.source.push_records(Vec::new());
    h.source.push_records(vec![available("A")]);

    for cycle in 1..=19 {
        let outcome = h.poll.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Reported {
                records: 2,
                silent: false
            },
            "cycle {cycle}"
        );
    }

    let outcome = h.poll.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Reported {
            records: 2,
            silent: true
        }
    );
    let data = h.sink.on(Channel::Data);
    assert_eq!(data.len(), 40);
    assert!(data[38].silent && data[39].silent);
    assert!(data[..38].iter().all(|m| !m.silent));

    assert_eq!(h.poll.run_cycle().await.unwrap(), CycleOutcome::NothingAvailable);
    assert_eq!(h.poll.throttle().streak(), 0);

    assert_eq!(
        h.poll.run_cycle().await.unwrap(),
        CycleOutcome::Reported {
            records: 1,
            silent: false
        }
    );
}

#[tokio::test]
async fn test_sink_failure_is_fatal() {
    let mut h = harness();
    h.source.push_records(vec![available("A")]);
    h.sink.fail_next(1);

    let err = h.poll.run_cycle().await.unwrap_err();
    assert!(matches!(err, EngineError::Notify(_)));
}

// ============================================================================
// Session Handling
// ============================================================================

#[tokio::test]
async fn test_upstream_error_invalidates_and_saves_body() {
    let mut h = harness();
    h.source.push_error(upstream(403));

    let outcome = h.poll.run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::SessionInvalidated);
    assert_eq!(h.poll.session().state(), SessionState::LoggedOut);

    let control = h.sink.on(Channel::Control);
    assert_eq!(control.len(), 1);
    let notice = &control[0].text;
    assert!(notice.contains("Received status code 403 from the endpoint https://portal.test/elenca-sede"));
    assert!(notice.contains("content-type: text/html"));
    assert!(notice.contains("upstream-"));

    let mut entries = std::fs::read_dir(h.diagnostics.path()).unwrap();
    let saved = entries.next().unwrap().unwrap().path();
    assert_eq!(
        std::fs::read_to_string(saved).unwrap(),
        "<html>Access denied</html>"
    );
    assert!(h.sink.on(Channel::Data).is_empty());
}

#[tokio::test]
async fn test_next_cycle_reauthenticates_before_fetching() {
    let mut h = harness();
    h.source.push_error(upstream(401));
    h.source.push_records(vec![available("A")]);

    h.poll.run_cycle().await.unwrap();
    assert_eq!(h.auth.calls(), 0);
    assert_eq!(h.source.fetches(), 1);

    let outcome = h.poll.run_cycle().await.unwrap();

    assert!(matches!(outcome, CycleOutcome::Reported { records: 1, .. }));
    assert_eq!(h.auth.calls(), 1);
    assert_eq!(h.source.logins(), 1);
    assert_eq!(h.source.last_bundle().unwrap().csrf_token, "csrf-1");
    assert_eq!(h.poll.session().state(), SessionState::LoggedIn);
}

#[tokio::test]
async fn test_session_expired_invalidates_without_artifact() {
    let mut h = harness();
    h.source
        .push_error(FetchError::SessionExpired("https://portal.test/login".to_string()));

    let outcome = h.poll.run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::SessionInvalidated);
    assert_eq!(h.poll.session().state(), SessionState::LoggedOut);
    assert_eq!(std::fs::read_dir(h.diagnostics.path()).unwrap().count(), 0);
    assert_eq!(h.sink.on(Channel::Control).len(), 1);
}

#[tokio::test]
async fn test_malformed_response_keeps_session() {
    let mut h = harness();
    h.source
        .push_error(FetchError::Malformed("missing field `list`".to_string()));

    let outcome = h.poll.run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::MalformedResponse);
    assert_eq!(h.poll.session().state(), SessionState::LoggedIn);
    let control = h.sink.on(Channel::Control);
    assert_eq!(
        control[0].text,
        "Could not decode the server response, retrying..."
    );
    assert_eq!(h.poll.delay_after(&outcome), Duration::from_secs(60));
}

#[tokio::test]
async fn test_login_failure_backs_off_without_fetching() {
    let auth = FakeAuthenticator::failing(|| {
        AutomationError::ElementNotFound("Entra con SPID".to_string())
    });
    let mut h = harness_with(auth, SessionState::LoggedOut);

    let outcome = h.poll.run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::LoginFailed);
    assert_eq!(h.poll.session().state(), SessionState::LoggedOut);
    assert_eq!(h.source.fetches(), 0);
    assert_eq!(h.poll.delay_after(&outcome), Duration::from_secs(300));
    assert_eq!(
        h.sink.on(Channel::Control)[0].text,
        "Could not login, retrying in 5 minutes..."
    );

    h.auth.recover();
    h.source.push_records(vec![available("A")]);
    let outcome = h.poll.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Reported { .. }));
    assert_eq!(h.auth.calls(), 2);
}

#[tokio::test]
async fn test_unclassified_errors_escape_the_loop() {
    let mut h = harness();
    h.source
        .push_error(FetchError::Http(HttpError::Timeout));

    let err = h.poll.run_cycle().await.unwrap_err();
    assert!(matches!(err, EngineError::Fetch(FetchError::Http(_))));
    assert_eq!(h.poll.session().state(), SessionState::LoggedIn);
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_run_stops_during_the_wait() {
    let mut h = harness();
    h.source.push_records(vec![available("A")]);
    let (trigger, shutdown) = shutdown_channel();

    let stop = async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.trigger();
    };
    // The default 60 s interval would outlast the timeout
    let (result, ()) = tokio::time::timeout(Duration::from_secs(1), async {
        tokio::join!(h.poll.run(&shutdown), stop)
    })
    .await
    .unwrap();

    result.unwrap();
    assert_eq!(h.source.fetches(), 1);
    assert_eq!(h.sink.on(Channel::Data).len(), 1);
}

#[tokio::test]
async fn test_run_after_shutdown_does_nothing() {
    let mut h = harness();
    let (trigger, shutdown) = shutdown_channel();
    trigger.trigger();

    h.poll.run(&shutdown).await.unwrap();
    assert_eq!(h.source.fetches(), 0);
}

#[tokio::test]
async fn test_interrupted_login_is_not_fatal() {
    let (trigger, shutdown) = shutdown_channel();
    let auth = FakeAuthenticator::waiting_for(shutdown.clone());
    let mut h = harness_with(auth, SessionState::LoggedOut);

    let stop = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.trigger();
    };
    let (result, ()) = tokio::time::timeout(Duration::from_secs(1), async {
        tokio::join!(h.poll.run(&shutdown), stop)
    })
    .await
    .unwrap();

    result.unwrap();
    assert!(h.auth.released());
    assert_eq!(h.source.fetches(), 0);
    assert!(h.sink.messages().is_empty());
}
