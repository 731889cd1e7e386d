use shadelink_core::CoveringError;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Device name is empty")]
    UnnamedDevice,

    #[error("Device name already exists: {0}")]
    DuplicateDevice(String),

    #[error("Device {device} refers to unknown bridge {host}")]
    UnknownBridge { device: String, host: String },

    #[error("Device {device} has an invalid {command} code: {source}")]
    InvalidCode {
        device: String,
        command: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error(transparent)]
    Covering(#[from] CoveringError),

    #[error("Coverings need a current-thread runtime, got {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
