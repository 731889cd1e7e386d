use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RadioError {
    #[error("Bridge rejected payload: {0}")]
    Rejected(String),

    #[error("Bridge unavailable")]
    Unavailable,
}

/// Transmit side of a paired RF bridge.
#[async_trait]
pub trait RadioLink: Send + Sync {
    /// Queue one opaque command payload on the bridge.
    ///
    /// Success only means the bridge accepted the payload, not that the motor moved.
    async fn enqueue(&self, payload: &[u8]) -> Result<(), RadioError>;
}
