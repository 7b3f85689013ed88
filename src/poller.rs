use crate::audit::AuditSink;
use crate::dispatch::AccessController;
use crate::gateway::Gateway;
use crate::liveness::LivenessReporter;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Delay between poll iterations, bounding the request rate when the long
/// poll returns immediately.
const IDLE_DELAY: Duration = Duration::from_secs(1);

/// Backoff after a failed poll, matching the channel listen loops.
const POLL_BACKOFF: Duration = Duration::from_secs(5);

/// Wall-clock watchdog timer, checked once per loop iteration. Extracted so
/// the firing logic is testable against an injected `Instant`.
pub struct HeartbeatTimer {
    interval: Duration,
    last: Instant,
}

impl HeartbeatTimer {
    #[must_use]
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self { interval, last: now }
    }

    /// True when the interval has elapsed; resets the timer when it fires.
    pub fn due(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// The outer update-dispatch loop: fetch a batch, route each event, advance
/// the cursor, pet the watchdog. Runs until process termination.
pub struct UpdatePoller {
    gateway: Arc<dyn Gateway>,
    controller: AccessController,
    liveness: Arc<dyn LivenessReporter>,
    audit: Arc<dyn AuditSink>,
    watchdog_interval: Duration,
}

impl UpdatePoller {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn Gateway>,
        controller: AccessController,
        liveness: Arc<dyn LivenessReporter>,
        audit: Arc<dyn AuditSink>,
        watchdog_interval: Duration,
    ) -> Self {
        Self {
            gateway,
            controller,
            liveness,
            audit,
            watchdog_interval,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        self.liveness.heartbeat();
        let mut timer = HeartbeatTimer::new(self.watchdog_interval, Instant::now());
        let mut offset: Option<i64> = None;

        loop {
            match self.gateway.fetch_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        // Advance past this update even when it carries no
                        // event or its handler fails: never rewind, never
                        // let one bad event halt the stream.
                        offset = Some(update.id + 1);

                        let Some(event) = update.event else {
                            continue;
                        };
                        if let Err(e) = self.controller.handle_event(event).await {
                            tracing::warn!("error handling update {}: {e:#}", update.id);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("poll error: {e:#}");
                    tokio::time::sleep(POLL_BACKOFF).await;
                }
            }

            if timer.due(Instant::now()) {
                self.audit.record("pik");
                self.liveness.heartbeat();
            }

            tokio::time::sleep(IDLE_DELAY).await;
        }
    }
}
