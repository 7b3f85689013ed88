use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// How long the door is held open between engage and disengage. Fixed design
/// constant, deliberately not configurable.
pub const DOOR_HOLD: Duration = Duration::from_secs(7);

/// Physical door actuator. Must be called in strict engage-then-disengage
/// order with the hold between them.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn engage(&self) -> Result<()>;
    async fn disengage(&self) -> Result<()>;
}

/// Drives the door relay through `raspi-gpio`.
pub struct GpioActuator {
    pin: u8,
}

impl GpioActuator {
    #[must_use]
    pub fn new(pin: u8) -> Self {
        Self { pin }
    }

    async fn set(&self, state: &str) -> Result<()> {
        let status = Command::new("raspi-gpio")
            .args(["set", &self.pin.to_string(), state])
            .status()
            .await
            .context("spawn raspi-gpio")?;
        anyhow::ensure!(status.success(), "raspi-gpio set {} {state} failed", self.pin);
        Ok(())
    }

    /// Configure the pin as an output and drive it low. Run once at startup.
    pub async fn init(&self) -> Result<()> {
        self.set("op").await?;
        self.set("dl").await
    }
}

#[async_trait]
impl Actuator for GpioActuator {
    async fn engage(&self) -> Result<()> {
        self.set("dh").await
    }

    async fn disengage(&self) -> Result<()> {
        self.set("dl").await
    }
}
