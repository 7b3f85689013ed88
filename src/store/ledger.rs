use crate::gateway::NotificationHandle;
use std::collections::HashMap;

/// Typed composite key: which admin was notified about which requester.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LedgerKey {
    admin: String,
    requester: String,
}

/// Tracks the approval notification sent to each administrator for each
/// pending requester, so every admin's stale Allow/Deny buttons can be
/// retracted once any one admin decides.
#[derive(Debug, Default)]
pub struct NotificationLedger {
    notifications: HashMap<LedgerKey, NotificationHandle>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        admin: impl Into<String>,
        requester: impl Into<String>,
        handle: NotificationHandle,
    ) {
        self.notifications.insert(
            LedgerKey {
                admin: admin.into(),
                requester: requester.into(),
            },
            handle,
        );
    }

    /// Return and remove every notification recorded for `requester`, across
    /// all administrators.
    pub fn drain_all_for(&mut self, requester: &str) -> Vec<(String, NotificationHandle)> {
        let mut drained = Vec::new();
        self.notifications.retain(|key, handle| {
            if key.requester == requester {
                drained.push((key.admin.clone(), *handle));
                false
            } else {
                true
            }
        });
        drained
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}
