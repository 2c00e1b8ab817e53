//! Telegram Bot API sink.

use async_trait::async_trait;
use passabot_core::html::{MESSAGE_CHAR_LIMIT, truncate_chars};
use passabot_fetch::HttpTransport;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::{Channel, Message, MessageFormat, NotificationSink, NotifyError};

/// Host of the Bot API, for transport allowlists.
pub const TELEGRAM_API_DOMAIN: &str = "api.telegram.org";

/// Error body of the Bot API.
#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages through a Telegram bot.
pub struct TelegramSink {
    transport: Arc<dyn HttpTransport>,
    token: String,
    data_chat_id: String,
    control_chat_id: String,
    base_url: String,
}

impl TelegramSink {
    /// Creates a sink for the given bot token and chats.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token: impl Into<String>,
        data_chat_id: impl Into<String>,
        control_chat_id: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let token = token.into();
        let data_chat_id = data_chat_id.into();
        let control_chat_id = control_chat_id.into();

        if token.trim().is_empty() {
            return Err(NotifyError::Config("bot token is empty".to_string()));
        }
        if data_chat_id.trim().is_empty() || control_chat_id.trim().is_empty() {
            return Err(NotifyError::Config("chat id is empty".to_string()));
        }

        Ok(Self {
            transport,
            token,
            data_chat_id,
            control_chat_id,
            base_url: format!("https://{TELEGRAM_API_DOMAIN}"),
        })
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chat_id(&self, channel: Channel) -> &str {
        match channel {
            Channel::Data => &self.data_chat_id,
            Channel::Control => &self.control_chat_id,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }
}

impl fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSink")
            .field("data_chat_id", &self.data_chat_id)
            .field("control_chat_id", &self.control_chat_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    #[instrument(skip(self, message), fields(channel = channel.as_str(), silent = message.silent))]
    async fn send(&self, channel: Channel, message: &Message) -> Result<(), NotifyError> {
        let fits = message.text.chars().count() <= MESSAGE_CHAR_LIMIT;
        let mut body = json!({
            "chat_id": self.chat_id(channel),
            "text": truncate_chars(&message.text, MESSAGE_CHAR_LIMIT),
            "disable_notification": message.silent,
        });
        // Cutting HTML can leave a tag open, which the API rejects
        match message.format {
            MessageFormat::Html if fits => body["parse_mode"] = json!("HTML"),
            MessageFormat::Html => {
                warn!(chars = message.text.chars().count(), "HTML message too long, sending as plain text");
            }
            MessageFormat::Plain => {}
        }

        let response = self
            .transport
            .post_json(&self.endpoint(), &body, HeaderMap::new())
            .await?;

        let reply: Option<ApiReply> = response.json().ok();
        let accepted = response.is_success() && reply.as_ref().is_none_or(|r| r.ok);
        if !accepted {
            let description = reply
                .and_then(|r| r.description)
                .unwrap_or_else(|| response.body.clone());
            warn!(status = response.status, description = %description, "Telegram rejected message");
            return Err(NotifyError::Rejected {
                status: response.status,
                description,
            });
        }

        debug!("Message delivered");
        Ok(())
    }
}
