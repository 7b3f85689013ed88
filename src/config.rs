use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_whitelist_path() -> PathBuf {
    PathBuf::from("whitelist.json")
}

fn default_gpio_pin() -> u8 {
    15
}

fn default_poll_timeout() -> u64 {
    60
}

fn default_watchdog_interval() -> u64 {
    600
}

/// Deployment configuration, loaded once at startup.
///
/// A missing or unparsable config file is fatal: the process must not start
/// without credentials (§ startup failure policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telegram Bot API token.
    pub bot_token: String,

    /// Chat ids of the administrators. Admins are implicitly pre-authorized:
    /// they seed the whitelist on first run.
    pub admin_ids: Vec<String>,

    /// Persisted whitelist location.
    #[serde(default = "default_whitelist_path")]
    pub whitelist_path: PathBuf,

    /// BCM pin driving the door relay.
    #[serde(default = "default_gpio_pin")]
    pub gpio_pin: u8,

    /// Long-poll bound for getUpdates, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// systemd watchdog interval, in seconds.
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval_secs: u64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.trim().is_empty() {
            return Err(ConfigError::Validation("bot_token is empty".into()));
        }
        if self.admin_ids.is_empty() {
            return Err(ConfigError::Validation(
                "admin_ids must list at least one administrator".into(),
            ));
        }
        Ok(())
    }
}
