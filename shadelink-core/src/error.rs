use crate::radio::RadioError;

#[derive(Debug, thiserror::Error)]
pub enum CoveringError {
    #[error("Transmit error: {0}")]
    Transmit(#[from] RadioError),

    #[error("Invalid device profile: {0}")]
    InvalidProfile(String),

    #[error("Superseded by a newer target")]
    Superseded,

    #[error("Motion sequence cancelled")]
    Cancelled,
}

pub type Result<T> = core::result::Result<T, CoveringError>;
