use crate::gateway::SenderProfile;
use std::collections::HashMap;

/// Transient registry of outstanding access requests, keyed by requester
/// identity. At most one request per identity: a repeated `register` from a
/// still-pending identity overwrites the stored profile (tolerating profile
/// edits between requests) rather than erroring.
#[derive(Debug, Default)]
pub struct PendingRequests {
    requests: HashMap<String, SenderProfile>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, identity: impl Into<String>, profile: SenderProfile) {
        self.requests.insert(identity.into(), profile);
    }

    /// Remove-and-return in one step, so a decision can never be applied
    /// twice to the same request even if the decision event is redelivered.
    pub fn take(&mut self, identity: &str) -> Option<SenderProfile> {
        self.requests.remove(identity)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
