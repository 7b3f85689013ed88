#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use domofon::actuator::GpioActuator;
use domofon::audit::{AuditSink, TracingAudit};
use domofon::dispatch::AccessController;
use domofon::gateway::{Gateway, TelegramGateway};
use domofon::liveness::{LivenessReporter, SystemdReporter};
use domofon::poller::UpdatePoller;
use domofon::store::WhitelistStore;
use domofon::Config;

/// Telegram-mediated door access gateway.
#[derive(Debug, Parser)]
#[command(name = "domofon", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "domofon.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS.
    // This prevents the error: "could not automatically determine the process-level CryptoProvider"
    // when both aws-lc-rs and ring features are available (or neither is explicitly selected).
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let audit: Arc<dyn AuditSink> = Arc::new(TracingAudit);
    audit.record("Bot starting...");

    let actuator = GpioActuator::new(config.gpio_pin);
    actuator.init().await?;

    let whitelist = WhitelistStore::load_or_seed(&config.whitelist_path, &config.admin_ids)?;

    let gateway = Arc::new(TelegramGateway::new(
        config.bot_token.clone(),
        config.poll_timeout_secs,
    ));

    // Best-effort restart notice to the first admin.
    if let Some(first_admin) = config.admin_ids.first() {
        if let Err(e) = gateway
            .send_notification(first_admin, "Bot has restarted", None)
            .await
        {
            tracing::warn!("failed sending restart notice: {e:#}");
        }
    }

    let controller = AccessController::new(
        config.admin_ids.clone(),
        whitelist,
        gateway.clone(),
        Arc::new(actuator),
        audit.clone(),
    );

    let liveness: Arc<dyn LivenessReporter> = Arc::new(SystemdReporter::from_env());
    let poller = UpdatePoller::new(
        gateway,
        controller,
        liveness,
        audit.clone(),
        Duration::from_secs(config.watchdog_interval_secs),
    );

    audit.record("!!bot ready!!");
    poller.run().await
}
