//! Liveness messages.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::notify::{Channel, Message, NotificationSink};

/// Text of the heartbeat message.
pub const HEARTBEAT_TEXT: &str = "Bot is still running";

/// Sends a silent control message on a fixed interval.
///
/// Stateless apart from its schedule; it never looks at the poll loop.
pub struct Heartbeat {
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
}

impl Heartbeat {
    /// Creates a heartbeat.
    pub fn new(sink: Arc<dyn NotificationSink>, interval: Duration) -> Self {
        Self { sink, interval }
    }

    /// Sends one beat.
    pub async fn beat(&self) -> Result<(), EngineError> {
        debug!("Sending heartbeat");
        self.sink
            .send(Channel::Control, &Message::plain(HEARTBEAT_TEXT).silent(true))
            .await?;
        Ok(())
    }

    /// Beats forever. The first beat comes one interval after the call.
    pub async fn run(&self) -> Result<Infallible, EngineError> {
        info!(interval_secs = self.interval.as_secs(), "Starting heartbeat");
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.beat().await?;
        }
    }
}
