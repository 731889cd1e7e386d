use std::sync::Arc;

use shadelink_core::mock::RecordingRadio;
use shadelink_core::{CommandSet, CoveringController, DeviceProfile, MemoryStore};

pub const OPEN: [u8; 3] = [0xb2, 0x0c, 0x01];
pub const CLOSE: [u8; 3] = [0xb2, 0x0c, 0x02];
pub const STOP: [u8; 3] = [0xb2, 0x0c, 0x03];

pub struct MockCovering {
    pub controller: CoveringController,
    pub radio: Arc<RecordingRadio>,
    pub store: Arc<MemoryStore>,
}

impl MockCovering {
    pub fn new(current_position: u8) -> Self {
        Self::with_profile(test_profile(10.0, 10.0), current_position)
    }

    pub fn with_profile(profile: DeviceProfile, current_position: u8) -> Self {
        let radio = Arc::new(RecordingRadio::new());
        let store = Arc::new(MemoryStore::with_positions(current_position, current_position));
        let controller = CoveringController::new(profile, radio.clone(), store.clone()).unwrap();

        Self {
            controller,
            radio,
            store,
        }
    }
}

pub fn test_profile(total_duration_open: f64, total_duration_close: f64) -> DeviceProfile {
    DeviceProfile::new(
        "Test Blind",
        total_duration_open,
        total_duration_close,
        CommandSet {
            open: OPEN.to_vec(),
            close: CLOSE.to_vec(),
            stop: STOP.to_vec(),
        },
    )
}
