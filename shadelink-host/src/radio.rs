use std::time::Duration;

use async_trait::async_trait;
use shadelink_core::{RadioError, RadioLink};

/// Bridge stand-in that logs each payload instead of transmitting it.
#[derive(Debug, Clone)]
pub struct DryRunRadio {
    host: String,
    latency: Duration,
}

impl DryRunRadio {
    pub fn new(host: impl Into<String>, latency: Duration) -> Self {
        Self {
            host: host.into(),
            latency,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl RadioLink for DryRunRadio {
    async fn enqueue(&self, payload: &[u8]) -> Result<(), RadioError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        tracing::debug!("{} <- {}", self.host, hex::encode(payload));

        Ok(())
    }
}
