use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use shadelink_core::{CommandSet, DeviceProfile};

use crate::error::PlatformError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bridge {
    pub host: String,
    #[serde(default)]
    pub latency_ms: u64,
}

impl Bridge {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

/// Learned RF codes, hex encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandCodes {
    pub open: String,
    pub close: String,
    pub stop: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub host: String,
    pub total_duration_open: f64,
    pub total_duration_close: f64,
    #[serde(default)]
    pub send_stop_at_0: bool,
    #[serde(default)]
    pub send_stop_at_100: bool,
    pub data: CommandCodes,
}

impl Device {
    /// Decodes the hex codes and checks the profile is usable by a controller.
    pub fn profile(&self) -> Result<DeviceProfile, PlatformError> {
        let decode = |command: &'static str, code: &str| {
            hex::decode(code.trim()).map_err(|source| PlatformError::InvalidCode {
                device: self.name.clone(),
                command,
                source,
            })
        };

        let profile = DeviceProfile {
            name: self.name.clone(),
            total_duration_open: self.total_duration_open,
            total_duration_close: self.total_duration_close,
            send_stop_at_fully_open: self.send_stop_at_100,
            send_stop_at_fully_closed: self.send_stop_at_0,
            commands: CommandSet {
                open: decode("open", &self.data.open)?,
                close: decode("close", &self.data.close)?,
                stop: decode("stop", &self.data.stop)?,
            },
        };
        profile.validate()?;

        Ok(profile)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    #[serde(default)]
    pub bridges: Vec<Bridge>,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn bridge(&self, host: &str) -> Option<&Bridge> {
        self.bridges.iter().find(|bridge| bridge.host == host)
    }
}
