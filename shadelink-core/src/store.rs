use std::sync::{Mutex, MutexGuard, PoisonError};

/// Accessory context holding the simulated position.
///
/// Lives outside the controller so a rebuilt controller picks up where the old one left
/// off. Unset positions read as `None`; the controller treats them as fully closed.
pub trait PositionStore: Send + Sync {
    fn current_position(&self) -> Option<u8>;

    fn set_current_position(&self, position: u8);

    fn target_position(&self) -> Option<u8>;

    fn set_target_position(&self, position: u8);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PositionContext {
    pub current_position: Option<u8>,
    pub target_position: Option<u8>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    context: Mutex<PositionContext>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positions(current_position: u8, target_position: u8) -> Self {
        Self {
            context: Mutex::new(PositionContext {
                current_position: Some(current_position),
                target_position: Some(target_position),
            }),
        }
    }

    pub fn context(&self) -> PositionContext {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, PositionContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionStore for MemoryStore {
    fn current_position(&self) -> Option<u8> {
        self.lock().current_position
    }

    fn set_current_position(&self, position: u8) {
        self.lock().current_position = Some(position);
    }

    fn target_position(&self) -> Option<u8> {
        self.lock().target_position
    }

    fn set_target_position(&self, position: u8) {
        self.lock().target_position = Some(position);
    }
}
