use super::{
    Controls, DecisionAction, DecisionEvent, Event, Gateway, MessageEvent, NotificationHandle,
    SenderProfile, Update,
};
use crate::error::GatewayError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API gateway (long-polling).
pub struct TelegramGateway {
    bot_token: String,
    api_base: String,
    poll_timeout_secs: u64,
    client: reqwest::Client,
}

impl TelegramGateway {
    #[must_use]
    pub fn new(bot_token: impl Into<String>, poll_timeout_secs: u64) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout_secs,
            client: reqwest::Client::new(),
        }
    }

    /// Point the gateway at a different API host (mock server in tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    fn reply_markup(controls: &Controls) -> Value {
        match controls {
            Controls::Keyboard(labels) => serde_json::json!({ "keyboard": [labels] }),
            Controls::Approval { requester } => serde_json::json!({
                "inline_keyboard": [
                    [{"text": "Allow", "callback_data": format!("allow {requester}")}],
                    [{"text": "Deny", "callback_data": format!("deny {requester}")}]
                ]
            }),
        }
    }

    async fn send_message_payload(&self, payload: Value) -> Result<NotificationHandle> {
        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&payload)
            .send()
            .await
            .context("send Telegram message")?
            .error_for_status()
            .context("Telegram sendMessage rejected")?;

        let body: Value = response
            .json()
            .await
            .context("parse Telegram sendMessage response")?;
        let message_id = body
            .get("result")
            .and_then(|result| result.get("message_id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| GatewayError::MalformedResponse("sendMessage missing message_id".into()))?;
        Ok(NotificationHandle(message_id))
    }

    fn parse_message(message: &Value) -> Option<Event> {
        let sender = message
            .get("chat")
            .and_then(|chat| chat.get("id"))
            .and_then(Value::as_i64)?
            .to_string();
        let text = message.get("text").and_then(Value::as_str)?;
        let message_id = message.get("message_id").and_then(Value::as_i64)?;

        let from = message.get("from");
        let first_name = from
            .and_then(|f| f.get("first_name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let username = from
            .and_then(|f| f.get("username"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        Some(Event::Message(MessageEvent {
            sender,
            text: text.to_string(),
            profile: SenderProfile {
                first_name: first_name.to_string(),
                username: username.to_string(),
            },
            message_id,
        }))
    }

    fn parse_callback(callback: &Value) -> Option<Event> {
        let decision_id = callback.get("id").and_then(Value::as_str)?;
        let data = callback.get("data").and_then(Value::as_str)?;
        let issuer = callback
            .get("from")
            .and_then(|f| f.get("id"))
            .and_then(Value::as_i64)?
            .to_string();

        let mut parts = data.split_whitespace();
        let action = match parts.next()? {
            "allow" => DecisionAction::Allow,
            "deny" => DecisionAction::Deny,
            other => {
                tracing::warn!("unrecognized callback action: {other}");
                return None;
            }
        };
        let requester = parts.next()?.to_string();

        Some(Event::Decision(DecisionEvent {
            decision_id: decision_id.to_string(),
            action,
            requester,
            issuer,
        }))
    }

    /// Map one raw update to an [`Update`]. Unrecognized payloads become
    /// `event: None` so the poll cursor still advances past them.
    fn parse_update(update: &Value) -> Option<Update> {
        let id = update.get("update_id").and_then(Value::as_i64)?;

        let event = if let Some(message) = update.get("message") {
            Self::parse_message(message)
        } else if let Some(callback) = update.get("callback_query") {
            Self::parse_callback(callback)
        } else {
            None
        };

        Some(Update { id, event })
    }
}

#[async_trait]
impl Gateway for TelegramGateway {
    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let mut body = serde_json::json!({
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message", "callback_query"]
        });
        if let Some(offset) = offset {
            body["offset"] = Value::from(offset);
        }

        let response = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&body)
            .send()
            .await
            .context("poll Telegram updates")?
            .error_for_status()
            .context("Telegram getUpdates rejected")?;

        let body: Value = response
            .json()
            .await
            .context("parse Telegram getUpdates response")?;

        let mut updates = Vec::new();
        if let Some(results) = body.get("result").and_then(Value::as_array) {
            for raw in results {
                match Self::parse_update(raw) {
                    Some(update) => updates.push(update),
                    None => tracing::warn!("skipping update without update_id"),
                }
            }
        }
        Ok(updates)
    }

    async fn send_notification(
        &self,
        recipient: &str,
        text: &str,
        controls: Option<Controls>,
    ) -> Result<NotificationHandle> {
        let mut payload = serde_json::json!({
            "chat_id": recipient,
            "text": text,
        });
        if let Some(controls) = controls {
            payload["reply_markup"] = Self::reply_markup(&controls);
        }
        self.send_message_payload(payload).await
    }

    async fn send_reply(
        &self,
        recipient: &str,
        text: &str,
        reply_to: i64,
        controls: Option<Controls>,
    ) -> Result<NotificationHandle> {
        let mut payload = serde_json::json!({
            "chat_id": recipient,
            "text": text,
            "reply_to_message_id": reply_to,
        });
        if let Some(controls) = controls {
            payload["reply_markup"] = Self::reply_markup(&controls);
        }
        self.send_message_payload(payload).await
    }

    async fn retract_controls(
        &self,
        recipient: &str,
        handle: NotificationHandle,
    ) -> Result<()> {
        self.client
            .post(self.api_url("editMessageReplyMarkup"))
            .json(&serde_json::json!({
                "chat_id": recipient,
                "message_id": handle.0,
            }))
            .send()
            .await
            .context("retract Telegram reply markup")?
            .error_for_status()
            .context("Telegram editMessageReplyMarkup rejected")?;
        Ok(())
    }

    async fn acknowledge_decision(&self, decision_id: &str) -> Result<()> {
        self.client
            .post(self.api_url("answerCallbackQuery"))
            .json(&serde_json::json!({ "callback_query_id": decision_id }))
            .send()
            .await
            .context("acknowledge Telegram callback query")?
            .error_for_status()
            .context("Telegram answerCallbackQuery rejected")?;
        Ok(())
    }
}
