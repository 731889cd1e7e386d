use serde::{Deserialize, Serialize};

pub const FULLY_CLOSED: u8 = 0;
pub const FULLY_OPEN: u8 = 100;

/// The controller's belief about which way the covering is travelling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionState {
    #[default]
    Stopped,
    Increasing,
    Decreasing,
}

impl MotionState {
    pub fn is_moving(&self) -> bool {
        !matches!(self, MotionState::Stopped)
    }

    /// Endstop this motion is heading towards, if any.
    pub fn endstop(&self) -> Option<u8> {
        match self {
            MotionState::Stopped => None,
            MotionState::Increasing => Some(FULLY_OPEN),
            MotionState::Decreasing => Some(FULLY_CLOSED),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionState::Stopped => "stopped",
            MotionState::Increasing => "increasing",
            MotionState::Decreasing => "decreasing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stopped() {
        assert_eq!(MotionState::default(), MotionState::Stopped);
        assert!(!MotionState::default().is_moving());
    }

    #[test]
    fn test_endstops() {
        assert_eq!(MotionState::Stopped.endstop(), None);
        assert_eq!(MotionState::Increasing.endstop(), Some(FULLY_OPEN));
        assert_eq!(MotionState::Decreasing.endstop(), Some(FULLY_CLOSED));
    }
}
