use std::sync::Arc;

use tokio::io::BufReader;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::PlatformError;
use crate::platform::Platform;
use crate::settings::Settings;

pub mod console;
pub mod error;
pub mod platform;
pub mod radio;
pub mod settings;

pub async fn run(settings: &Arc<Settings>) -> Result<(), PlatformError> {
    ensure_current_thread()?;

    let mut platform = Platform::new(settings)?;

    if platform.is_empty() {
        tracing::warn!("no devices configured");
    }
    tracing::info!("{} coverings ready: {:?}", platform.len(), platform.names());

    console::run(&mut platform, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Position ticks and `set_target` both read and rewrite the stored estimate, so every
/// covering task has to share one thread.
fn ensure_current_thread() -> Result<(), PlatformError> {
    match Handle::current().runtime_flavor() {
        RuntimeFlavor::CurrentThread => Ok(()),
        flavor => Err(PlatformError::Runtime(format!("{flavor:?}"))),
    }
}
