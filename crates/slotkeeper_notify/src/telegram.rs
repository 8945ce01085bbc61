// --- File: crates/slotkeeper_notify/src/telegram.rs ---
//! Telegram Bot API sink.
//!
//! The customer id is used as the Telegram `chat_id`. Reminder actions become
//! an inline keyboard whose buttons carry [`ReminderAction::callback_data`].
//!
//! The bot token is part of the request path. It must not appear in errors
//! or logs, which is why nothing here formats the URL.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use slotkeeper_common::models::ReminderAction;
use slotkeeper_common::{HttpTransport, NotificationSink, NotifyError};
use slotkeeper_config::TelegramConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Serialize, Debug)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Deserialize, Debug)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

/// All actions on a single keyboard row.
pub(crate) fn keyboard(actions: &[ReminderAction]) -> Option<InlineKeyboardMarkup> {
    if actions.is_empty() {
        return None;
    }
    let row = actions
        .iter()
        .map(|action| InlineKeyboardButton {
            text: action.label().to_string(),
            callback_data: action.callback_data(),
        })
        .collect();
    Some(InlineKeyboardMarkup {
        inline_keyboard: vec![row],
    })
}

pub struct TelegramNotifier {
    transport: Arc<dyn HttpTransport>,
    client: Client,
    send_message_url: Url,
}

impl TelegramNotifier {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        client: Client,
        config: &TelegramConfig,
    ) -> Result<Self, NotifyError> {
        let base = config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
        let raw = format!(
            "{}/bot{}/sendMessage",
            base.trim_end_matches('/'),
            config.bot_token
        );
        let send_message_url = Url::parse(&raw).map_err(|e| NotifyError::Rejected {
            status: 0,
            message: format!("invalid Telegram API base {}: {}", base, e),
        })?;
        Ok(Self {
            transport,
            client,
            send_message_url,
        })
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn notify(
        &self,
        customer_id: &str,
        message: &str,
        actions: &[ReminderAction],
    ) -> Result<(), NotifyError> {
        if customer_id.trim().is_empty() {
            return Err(NotifyError::InvalidRecipient(customer_id.to_string()));
        }

        let payload = SendMessageRequest {
            chat_id: customer_id,
            text: message,
            reply_markup: keyboard(actions),
        };
        let request = self
            .client
            .post(self.send_message_url.clone())
            .json(&payload)
            .build()
            .map_err(|e| NotifyError::Rejected {
                status: 0,
                message: e.without_url().to_string(),
            })?;

        // Reminder sends are not tied to a caller; the scheduler retries on its next tick.
        let response = self
            .transport
            .send(request, &CancellationToken::new())
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let reply: Option<ApiReply> = serde_json::from_str(&body).ok();

        match reply {
            Some(ApiReply { ok: true, .. }) if status.is_success() => {
                info!(chat_id = %customer_id, "Telegram reminder delivered");
                Ok(())
            }
            Some(reply) => {
                let code = reply.error_code.unwrap_or(status.as_u16());
                let description = reply.description.unwrap_or(body);
                error!("Telegram returned {}: {}", code, description);
                if code == 400 && description.contains("chat not found") {
                    return Err(NotifyError::InvalidRecipient(customer_id.to_string()));
                }
                Err(NotifyError::Rejected {
                    status: code,
                    message: description,
                })
            }
            None => {
                error!("Telegram returned {}: {}", status, body);
                Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }
}
