//! Authorization state: the persisted whitelist plus the two transient
//! registries tracking in-flight access requests.

pub mod ledger;
pub mod pending;
pub mod whitelist;

pub use ledger::NotificationLedger;
pub use pending::PendingRequests;
pub use whitelist::{WhitelistEntry, WhitelistStore};
