//! Inbound event dispatch: the command state machine over message intents
//! and the finalization machine over administrator decisions.

mod command;
mod decision;

pub use command::Intent;

use crate::actuator::Actuator;
use crate::audit::AuditSink;
use crate::gateway::{Controls, Event, Gateway};
use crate::store::{NotificationLedger, PendingRequests, WhitelistStore};
use anyhow::Result;
use std::sync::Arc;

/// Owns the authorization state and drives it from inbound events.
///
/// Processing is strictly sequential: one event is fully handled (including
/// outbound notifications and, for `open`, the actuator hold) before the
/// next, so the stores need no interior locking.
pub struct AccessController {
    admins: Vec<String>,
    whitelist: WhitelistStore,
    pending: PendingRequests,
    ledger: NotificationLedger,
    gateway: Arc<dyn Gateway>,
    actuator: Arc<dyn Actuator>,
    audit: Arc<dyn AuditSink>,
}

impl AccessController {
    #[must_use]
    pub fn new(
        admins: Vec<String>,
        whitelist: WhitelistStore,
        gateway: Arc<dyn Gateway>,
        actuator: Arc<dyn Actuator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            admins,
            whitelist,
            pending: PendingRequests::new(),
            ledger: NotificationLedger::new(),
            gateway,
            actuator,
            audit,
        }
    }

    pub async fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Message(message) => self.handle_message(message).await,
            Event::Decision(decision) => self.handle_decision(decision).await,
        }
    }

    pub fn admins(&self) -> &[String] {
        &self.admins
    }

    pub fn whitelist(&self) -> &WhitelistStore {
        &self.whitelist
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn ledger(&self) -> &NotificationLedger {
        &self.ledger
    }

    fn is_admin(&self, identity: &str) -> bool {
        self.admins.iter().any(|admin| admin == identity)
    }

    /// Best-effort broadcast: a send failure for one admin must not prevent
    /// notifying the rest.
    async fn notify_admins(&self, text: &str, controls: Option<Controls>) {
        for admin in &self.admins {
            if let Err(e) = self
                .gateway
                .send_notification(admin, text, controls.clone())
                .await
            {
                tracing::warn!("failed notifying admin {admin}: {e:#}");
            }
        }
    }
}
