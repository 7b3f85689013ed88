use super::AccessController;
use crate::actuator::DOOR_HOLD;
use crate::gateway::{Controls, MessageEvent};
use anyhow::Result;

const REGISTER_PROMPT: &str = "Click register to submit request";

/// Normalized meaning of an inbound message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Start,
    Register,
    Open,
    Other,
}

impl Intent {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text {
            "/start" => Self::Start,
            "register" => Self::Register,
            "open" => Self::Open,
            _ => Self::Other,
        }
    }
}

impl AccessController {
    pub(super) async fn handle_message(&mut self, message: MessageEvent) -> Result<()> {
        match Intent::parse(&message.text) {
            Intent::Start => self.on_start(&message).await,
            Intent::Register => self.on_register(&message).await,
            Intent::Open => self.on_open(&message).await,
            Intent::Other => self.on_other(&message).await,
        }
    }

    async fn on_start(&self, message: &MessageEvent) -> Result<()> {
        if self.whitelist.contains(&message.sender) {
            self.gateway
                .send_notification(&message.sender, "sup", Some(Controls::keyboard("open")))
                .await?;
        } else {
            self.audit.record(&format!(
                "start cmd by {} {}",
                message.sender, message.profile.first_name
            ));
            self.gateway
                .send_notification(
                    &message.sender,
                    REGISTER_PROMPT,
                    Some(Controls::keyboard("register")),
                )
                .await?;
        }
        Ok(())
    }

    async fn on_register(&mut self, message: &MessageEvent) -> Result<()> {
        if self.whitelist.contains(&message.sender) {
            self.gateway
                .send_notification(&message.sender, "already", Some(Controls::keyboard("open")))
                .await?;
            return Ok(());
        }

        let request_text = format!(
            "New Request from \nName: {}\nUsername: {}\nID: {}",
            message.profile.first_name, message.profile.username, message.sender
        );

        self.pending
            .put(message.sender.clone(), message.profile.clone());

        for admin in &self.admins {
            let controls = Controls::Approval {
                requester: message.sender.clone(),
            };
            match self
                .gateway
                .send_notification(admin, &request_text, Some(controls))
                .await
            {
                Ok(handle) => self
                    .ledger
                    .record(admin.clone(), message.sender.clone(), handle),
                Err(e) => tracing::warn!("failed sending approval request to {admin}: {e:#}"),
            }
        }
        Ok(())
    }

    async fn on_open(&self, message: &MessageEvent) -> Result<()> {
        if !self.whitelist.contains(&message.sender) {
            self.gateway
                .send_reply(
                    &message.sender,
                    "✋️ not registered",
                    message.message_id,
                    Some(Controls::keyboard("register")),
                )
                .await?;
            self.audit.record(&format!(
                "TRIED TO OPEN by {}",
                message.profile.first_name
            ));
            return Ok(());
        }

        self.gateway
            .send_reply(
                &message.sender,
                "👋️. Door is open!",
                message.message_id,
                Some(Controls::keyboard("open")),
            )
            .await?;

        self.actuator.engage().await?;

        if !self.is_admin(&message.sender) {
            let guest_notice = format!("You have a guest {}", message.profile.first_name);
            self.notify_admins(&guest_notice, Some(Controls::keyboard("open")))
                .await;
        }

        // Blocking hold by design: subsequent events queue behind the door.
        tokio::time::sleep(DOOR_HOLD).await;
        self.actuator.disengage().await?;

        self.audit
            .record(&format!("Opened by {}", message.profile.first_name));
        Ok(())
    }

    async fn on_other(&self, message: &MessageEvent) -> Result<()> {
        if self.whitelist.contains(&message.sender) {
            self.gateway
                .send_notification(&message.sender, "?", Some(Controls::keyboard("open")))
                .await?;
        } else {
            self.gateway
                .send_notification(
                    &message.sender,
                    REGISTER_PROMPT,
                    Some(Controls::keyboard("register")),
                )
                .await?;
        }
        Ok(())
    }
}
