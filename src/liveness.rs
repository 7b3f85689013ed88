use std::os::unix::net::UnixDatagram;

/// Liveness signal emitted at a fixed interval by the poll loop, independent
/// of event arrival.
pub trait LivenessReporter: Send + Sync {
    fn heartbeat(&self);
}

/// Pets the systemd watchdog over `NOTIFY_SOCKET`.
///
/// When the socket is absent (running outside systemd) this degrades to a
/// no-op so local runs behave identically.
pub struct SystemdReporter {
    socket_path: Option<String>,
}

impl SystemdReporter {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            socket_path: std::env::var("NOTIFY_SOCKET").ok(),
        }
    }
}

impl LivenessReporter for SystemdReporter {
    fn heartbeat(&self) {
        let Some(path) = &self.socket_path else {
            tracing::debug!("NOTIFY_SOCKET unset, skipping watchdog ping");
            return;
        };

        let result = UnixDatagram::unbound()
            .and_then(|socket| socket.send_to(b"WATCHDOG=1", path))
            .map(|_| ());
        if let Err(e) = result {
            tracing::warn!("watchdog ping failed: {e}");
        }
    }
}
