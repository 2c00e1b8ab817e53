//! Run command - the long-running bot.

use anyhow::Result;
use passabot_core::SessionState;
use passabot_engine::{
    Channel, Heartbeat, Message, NotificationSink, PollLoop, PollSettings, SessionManager,
    report_fatal, run_until,
};
use passabot_fetch::{RetryStrategy, Shutdown};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::Cli;
use crate::app::App;

/// Runs the bot until Ctrl+C or a fatal error.
///
/// Fatal errors are reported to the control chat before they are returned.
/// Ctrl+C is honored during the start-up login too; the browser session is
/// released before the process exits.
pub async fn run(cli: &Cli) -> Result<()> {
    let app = App::load(cli).await?;
    let sink = app.sink()?;

    let result = execute(&app, sink.clone()).await;
    if let Err(e) = &result {
        error!(error = %e, "Bot stopped");
        if let Err(report_err) = report_fatal(sink.as_ref(), e, &RetryStrategy::default()).await {
            warn!(error = %report_err, "Could not report the error");
        }
    }
    result
}

async fn execute(app: &App, sink: Arc<dyn NotificationSink>) -> Result<()> {
    let settings = app.settings();
    info!(source = %settings.source, auth = %settings.auth, "Starting passabot");

    let launcher = app.launcher()?;
    let authenticator = app.authenticator(launcher.clone()).await?;
    let source = app.source(launcher).await?;

    let session = SessionManager::new(authenticator, SessionState::LoggedOut);
    let mut poll = PollLoop::new(
        source,
        session,
        sink.clone(),
        app.diagnostics(),
        PollSettings::from(settings),
    );

    let shutdown = app.shutdown();
    let started = start(&mut poll, sink.as_ref(), &shutdown).await;
    if started.is_err() || shutdown.is_triggered() {
        if let Err(close_err) = poll.close().await {
            warn!(error = %close_err, "Could not close the data source");
        }
        if shutdown.is_triggered() {
            info!("Stopped during start-up");
            return Ok(());
        }
        return started;
    }

    let heartbeat = Heartbeat::new(sink, settings.heartbeat_interval());
    run_until(poll, heartbeat, shutdown).await?;

    info!("passabot stopped");
    Ok(())
}

/// Initial login and start-up notice. A failed login is retried by the
/// first cycle.
async fn start(poll: &mut PollLoop, sink: &dyn NotificationSink, shutdown: &Shutdown) -> Result<()> {
    if !poll.login().await? {
        warn!("Initial login failed, the poll loop will retry");
    }
    if shutdown.is_triggered() {
        return Ok(());
    }
    sink.send(Channel::Control, &Message::plain("Bot started"))
        .await?;
    Ok(())
}
