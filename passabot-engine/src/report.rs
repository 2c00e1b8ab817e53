//! Reporting of fatal errors.

use passabot_core::html::escape;
use passabot_fetch::RetryStrategy;
use std::fmt::Display;
use tracing::{error, info, warn};

use crate::notify::{Channel, Message, NotificationSink, NotifyError};

/// Builds the control notice for a fatal error.
pub fn fatal_message(err: &dyn Display) -> Message {
    Message::html(format!(
        "An error occurred:\n\n<code>{}</code>",
        escape(&format!("{err:#}"))
    ))
}

/// Sends the fatal-error notice, retrying delivery failures.
///
/// Returns the last delivery error when every attempt failed.
pub async fn report_fatal(
    sink: &dyn NotificationSink,
    err: &dyn Display,
    retry: &RetryStrategy,
) -> Result<(), NotifyError> {
    let message = fatal_message(err);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match sink.send(Channel::Control, &message).await {
            Ok(()) => {
                info!(attempt, "Reported fatal error");
                return Ok(());
            }
            Err(e) if retry.should_retry(attempt) => {
                let delay = retry.delay_for_attempt(attempt);
                warn!(
                    attempt,
                    error = %e,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Could not report fatal error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(attempt, error = %e, "Giving up on reporting fatal error");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;
    use std::time::Duration;

    fn quick_retry() -> RetryStrategy {
        RetryStrategy::new(3).with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_message_escapes_error_text() {
        let message = fatal_message(&"element <div> not found");
        assert_eq!(
            message.text,
            "An error occurred:\n\n<code>element &lt;div&gt; not found</code>"
        );
        assert!(!message.silent);
    }

    #[tokio::test]
    async fn test_retries_until_delivered() {
        let sink = RecordingSink::new();
        sink.fail_next(2);

        report_fatal(sink.as_ref(), &"boom", &quick_retry())
            .await
            .unwrap();

        assert_eq!(sink.attempts(), 3);
        assert_eq!(sink.messages().len(), 1);
        assert_eq!(sink.messages()[0].0, Channel::Control);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sink = RecordingSink::new();
        sink.fail_next(10);

        let result = report_fatal(sink.as_ref(), &"boom", &quick_retry()).await;

        assert!(result.is_err());
        assert_eq!(sink.attempts(), 3);
        assert!(sink.messages().is_empty());
    }
}
