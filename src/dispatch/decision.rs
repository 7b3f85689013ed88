use super::AccessController;
use crate::gateway::{Controls, DecisionAction, DecisionEvent};
use crate::store::WhitelistEntry;
use anyhow::Result;

impl AccessController {
    pub(super) async fn handle_decision(&mut self, decision: DecisionEvent) -> Result<()> {
        match decision.action {
            DecisionAction::Allow => self.on_allow(&decision).await?,
            DecisionAction::Deny => self.on_deny(&decision).await,
        }

        // Retract the stale Allow/Deny buttons from every admin's copy,
        // per-item best-effort.
        for (admin, handle) in self.ledger.drain_all_for(&decision.requester) {
            if let Err(e) = self.gateway.retract_controls(&admin, handle).await {
                tracing::warn!("failed retracting buttons for admin {admin}: {e:#}");
            }
        }

        if let Err(e) = self
            .gateway
            .acknowledge_decision(&decision.decision_id)
            .await
        {
            tracing::warn!("failed acknowledging decision {}: {e:#}", decision.decision_id);
        }
        Ok(())
    }

    async fn on_allow(&mut self, decision: &DecisionEvent) -> Result<()> {
        // take() makes a redelivered decision a no-op: the profile is gone.
        let Some(profile) = self.pending.take(&decision.requester) else {
            self.audit.record(&format!(
                "User {} not found in pending requests",
                decision.requester
            ));
            return Ok(());
        };

        self.whitelist.add(WhitelistEntry {
            id: decision.requester.clone(),
            name: profile.first_name,
            username: profile.username,
        })?;

        self.notify_admins(
            &format!("Allowed {}", decision.requester),
            Some(Controls::keyboard("open")),
        )
        .await;

        if let Err(e) = self
            .gateway
            .send_notification(
                &decision.requester,
                "welcome",
                Some(Controls::keyboard("open")),
            )
            .await
        {
            tracing::warn!("failed welcoming {}: {e:#}", decision.requester);
        }

        self.audit
            .record(&format!("Added {} to whitelist", decision.requester));
        Ok(())
    }

    async fn on_deny(&mut self, decision: &DecisionEvent) {
        // No whitelist mutation; the pending profile is discarded if present.
        self.pending.take(&decision.requester);

        self.notify_admins(
            &format!("Denied {}", decision.requester),
            Some(Controls::keyboard("open")),
        )
        .await;

        if let Err(e) = self
            .gateway
            .send_notification(
                &decision.requester,
                "denied",
                Some(Controls::keyboard("register")),
            )
            .await
        {
            tracing::warn!("failed notifying denied {}: {e:#}", decision.requester);
        }

        self.audit.record(&format!("Denied {}", decision.requester));
    }
}
