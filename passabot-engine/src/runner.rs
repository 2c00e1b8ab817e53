//! Top-level task orchestration.

use passabot_fetch::Shutdown;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::heartbeat::Heartbeat;
use crate::poll::PollLoop;

/// Runs the poll loop and the heartbeat until `shutdown` fires or one of
/// them fails, then closes the poll loop's source.
///
/// The poll loop is left to wind down on its own after shutdown, so a login
/// in progress releases its browser session before this returns.
///
/// Returns `Ok(())` on shutdown and the first fatal error otherwise.
pub async fn run_until(
    mut poll: PollLoop,
    heartbeat: Heartbeat,
    shutdown: Shutdown,
) -> Result<(), EngineError> {
    let result = tokio::select! {
        result = poll.run(&shutdown) => {
            if shutdown.is_triggered() {
                info!("Shutdown requested");
            }
            result
        }
        result = heartbeat.run() => result.map(|never| match never {}),
    };

    if let Err(e) = poll.close().await {
        warn!(error = %e, "Could not close the data source");
    }

    result
}
