use std::time::Duration;

use crate::error::{CoveringError, Result};
use crate::state::{FULLY_CLOSED, FULLY_OPEN, MotionState};

/// Number of simulation ticks in one full traversal.
const TRAVEL_STEPS: f64 = 100.0;
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);
/// Longest accepted traversal, one hour.
const MAX_TRAVEL_SECONDS: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    Stop,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Open => "open",
            Command::Close => "close",
            Command::Stop => "stop",
        }
    }

    /// Command that starts the given motion.
    pub fn for_motion(state: MotionState) -> Option<Self> {
        match state {
            MotionState::Stopped => None,
            MotionState::Increasing => Some(Command::Open),
            MotionState::Decreasing => Some(Command::Close),
        }
    }
}

/// Opaque payloads the bridge transmits. Never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    pub open: Vec<u8>,
    pub close: Vec<u8>,
    pub stop: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub name: String,
    /// Seconds for a full 0 -> 100 traversal.
    pub total_duration_open: f64,
    /// Seconds for a full 100 -> 0 traversal.
    pub total_duration_close: f64,
    pub send_stop_at_fully_open: bool,
    pub send_stop_at_fully_closed: bool,
    pub commands: CommandSet,
}

impl DeviceProfile {
    pub fn new(
        name: impl Into<String>,
        total_duration_open: f64,
        total_duration_close: f64,
        commands: CommandSet,
    ) -> Self {
        Self {
            name: name.into(),
            total_duration_open,
            total_duration_close,
            send_stop_at_fully_open: false,
            send_stop_at_fully_closed: false,
            commands,
        }
    }

    pub fn payload(&self, command: Command) -> &[u8] {
        match command {
            Command::Open => &self.commands.open,
            Command::Close => &self.commands.close,
            Command::Stop => &self.commands.stop,
        }
    }

    /// Time the covering needs to travel one percent in the given direction.
    pub fn tick_interval(&self, state: MotionState) -> Option<Duration> {
        let total = match state {
            MotionState::Stopped => return None,
            MotionState::Increasing => self.total_duration_open,
            MotionState::Decreasing => self.total_duration_close,
        };

        let seconds = total.clamp(0.0, MAX_TRAVEL_SECONDS) / TRAVEL_STEPS;
        let interval = Duration::try_from_secs_f64(seconds).unwrap_or(MIN_TICK_INTERVAL);
        Some(interval.max(MIN_TICK_INTERVAL))
    }

    /// Whether a stop pulse is still sent once the estimate reaches this endstop.
    pub fn sends_stop_at(&self, endstop: u8) -> bool {
        match endstop {
            FULLY_OPEN => self.send_stop_at_fully_open,
            FULLY_CLOSED => self.send_stop_at_fully_closed,
            _ => true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoveringError::InvalidProfile("name is empty".to_string()));
        }

        for (label, duration) in [
            ("total_duration_open", self.total_duration_open),
            ("total_duration_close", self.total_duration_close),
        ] {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(CoveringError::InvalidProfile(format!(
                    "{}: {label} must be a positive number of seconds, got {duration}",
                    self.name
                )));
            }
            if duration > MAX_TRAVEL_SECONDS {
                return Err(CoveringError::InvalidProfile(format!(
                    "{}: {label} must be at most {MAX_TRAVEL_SECONDS} seconds, got {duration}",
                    self.name
                )));
            }
        }

        for command in [Command::Open, Command::Close, Command::Stop] {
            if self.payload(command).is_empty() {
                return Err(CoveringError::InvalidProfile(format!(
                    "{}: {} payload is empty",
                    self.name,
                    command.as_str()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(open: f64, close: f64) -> DeviceProfile {
        DeviceProfile::new(
            "Study",
            open,
            close,
            CommandSet {
                open: vec![0x01],
                close: vec![0x02],
                stop: vec![0x03],
            },
        )
    }

    #[test]
    fn test_tick_interval_is_one_percent_of_travel() {
        let profile = profile(10.0, 25.0);

        assert_eq!(profile.tick_interval(MotionState::Increasing), Some(Duration::from_millis(100)));
        assert_eq!(profile.tick_interval(MotionState::Decreasing), Some(Duration::from_millis(250)));
        assert_eq!(profile.tick_interval(MotionState::Stopped), None);
    }

    #[test]
    fn test_tick_interval_has_a_floor() {
        let profile = profile(0.00001, 10.0);

        assert_eq!(profile.tick_interval(MotionState::Increasing), Some(MIN_TICK_INTERVAL));
    }

    #[test]
    fn test_tick_interval_is_capped() {
        let profile = profile(1e30, 10.0);

        assert!(profile.validate().is_err());
        assert_eq!(profile.tick_interval(MotionState::Increasing), Some(Duration::from_secs(36)));
    }

    #[test]
    fn test_stop_at_endstops_follows_flags() {
        let mut profile = profile(10.0, 10.0);
        assert!(!profile.sends_stop_at(FULLY_OPEN));
        assert!(!profile.sends_stop_at(FULLY_CLOSED));
        assert!(profile.sends_stop_at(40));

        profile.send_stop_at_fully_open = true;
        assert!(profile.sends_stop_at(FULLY_OPEN));
        assert!(!profile.sends_stop_at(FULLY_CLOSED));
    }

    #[test]
    fn test_validate() {
        assert!(profile(10.0, 10.0).validate().is_ok());

        let test_cases = [
            (0.0, 10.0),
            (10.0, -1.0),
            (f64::NAN, 10.0),
            (10.0, f64::INFINITY),
            (3_600.5, 10.0),
        ];
        for (open, close) in test_cases {
            assert!(
                matches!(profile(open, close).validate(), Err(CoveringError::InvalidProfile(_))),
                "durations ({open}, {close}) should be rejected"
            );
        }

        let mut empty_stop = profile(10.0, 10.0);
        empty_stop.commands.stop.clear();
        assert!(empty_stop.validate().is_err());

        let mut unnamed = profile(10.0, 10.0);
        unnamed.name = "  ".to_string();
        assert!(unnamed.validate().is_err());
    }
}
