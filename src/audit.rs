/// Append-only audit sink. Best-effort: recording must never fail or block
/// the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, message: &str);
}

/// Audit sink backed by `tracing` under the `audit` target (picked up by the
/// journal when running under systemd).
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, message: &str) {
        tracing::info!(target: "audit", "{message}");
    }
}
