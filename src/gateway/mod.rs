//! Messaging gateway boundary.
//!
//! The core never touches wire bytes: it consumes the [`Gateway`] trait, and
//! `TelegramGateway` is the one production implementation. Tests substitute a
//! recording fake.

pub mod telegram;

pub use telegram::TelegramGateway;

use async_trait::async_trait;

/// Opaque reference to a sent notification, kept only so its interactive
/// controls can be retracted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationHandle(pub i64);

/// Interactive controls attached to an outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controls {
    /// One-row reply keyboard, e.g. `["open"]` or `["register"]`.
    Keyboard(Vec<String>),
    /// Inline Allow/Deny buttons for a pending requester. The callback data
    /// carries the requester identity (`"allow <id>"` / `"deny <id>"`).
    Approval { requester: String },
}

impl Controls {
    pub fn keyboard(label: &str) -> Self {
        Self::Keyboard(vec![label.to_string()])
    }
}

/// Profile fields captured from an inbound message sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderProfile {
    pub first_name: String,
    pub username: String,
}

/// An inbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Stable chat/user identifier, normalized to a string.
    pub sender: String,
    pub text: String,
    pub profile: SenderProfile,
    /// Message id of the inbound message, used for reply-to.
    pub message_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionAction {
    Allow,
    Deny,
}

/// An administrator's button press on a pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEvent {
    /// Callback query id, acknowledged after processing.
    pub decision_id: String,
    pub action: DecisionAction,
    /// Identity of the user the decision is about.
    pub requester: String,
    /// Identity of the administrator who pressed the button.
    pub issuer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(MessageEvent),
    Decision(DecisionEvent),
}

/// One inbound update. `event` is `None` when the update carries nothing the
/// core recognizes (edited messages, stickers, malformed payloads); the
/// cursor still advances past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub id: i64,
    pub event: Option<Event>,
}

/// Messaging gateway contract — implement for any transport.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Long-poll for the next batch of updates past `offset`.
    async fn fetch_updates(&self, offset: Option<i64>) -> anyhow::Result<Vec<Update>>;

    /// Send a message, returning a handle usable for control retraction.
    async fn send_notification(
        &self,
        recipient: &str,
        text: &str,
        controls: Option<Controls>,
    ) -> anyhow::Result<NotificationHandle>;

    /// Send a message as a reply to `reply_to`.
    async fn send_reply(
        &self,
        recipient: &str,
        text: &str,
        reply_to: i64,
        controls: Option<Controls>,
    ) -> anyhow::Result<NotificationHandle>;

    /// Strip the interactive controls from a previously sent notification.
    async fn retract_controls(
        &self,
        recipient: &str,
        handle: NotificationHandle,
    ) -> anyhow::Result<()>;

    /// Acknowledge a decision event so the issuing client stops its spinner.
    async fn acknowledge_decision(&self, decision_id: &str) -> anyhow::Result<()>;
}
