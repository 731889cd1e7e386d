use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::{CoveringError, Result};
use crate::profile::{Command, DeviceProfile};
use crate::radio::RadioLink;
use crate::state::{FULLY_CLOSED, FULLY_OPEN, MotionState};
use crate::store::PositionStore;

/// Accessory view of a covering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoveringSnapshot {
    pub name: String,
    pub current_position: u8,
    pub target_position: u8,
    pub motion_state: MotionState,
}

/// Outcome of the open/close pulse started by [`CoveringController::set_target`].
///
/// Dropping it does not cancel the sequence.
#[derive(Debug)]
pub struct PendingCommand {
    handle: Option<JoinHandle<Result<MotionState>>>,
}

impl PendingCommand {
    fn settled() -> Self {
        Self { handle: None }
    }

    /// True when the request needed no motion at all.
    pub fn is_settled(&self) -> bool {
        self.handle.is_none()
    }

    /// Waits for the pulse to be acknowledged and returns the resulting motion.
    pub async fn wait(self) -> Result<MotionState> {
        match self.handle {
            None => Ok(MotionState::Stopped),
            Some(handle) => handle.await.map_err(|_| CoveringError::Cancelled)?,
        }
    }
}

/// The single live simulation timer. `generation` identifies the motion that owns it and
/// is bumped whenever a new open/close sequence starts.
#[derive(Default)]
struct TimerSlot {
    generation: u64,
    active: Option<JoinHandle<()>>,
}

struct Shared {
    profile: DeviceProfile,
    radio: Arc<dyn RadioLink>,
    store: Arc<dyn PositionStore>,
    state: watch::Sender<MotionState>,
    timer: Mutex<TimerSlot>,
}

/// Simulates the position of a window covering that can only be driven by open, close and
/// stop pulses, with no position feedback.
pub struct CoveringController {
    shared: Arc<Shared>,
}

impl CoveringController {
    pub fn new(
        profile: DeviceProfile,
        radio: Arc<dyn RadioLink>,
        store: Arc<dyn PositionStore>,
    ) -> Result<Self> {
        profile.validate()?;

        let (state, _) = watch::channel(MotionState::Stopped);

        Ok(Self {
            shared: Arc::new(Shared {
                profile,
                radio,
                store,
                state,
                timer: Mutex::new(TimerSlot::default()),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.profile.name
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.shared.profile
    }

    pub fn current_position(&self) -> u8 {
        self.shared.current_position()
    }

    pub fn target_position(&self) -> u8 {
        self.shared.target_position()
    }

    pub fn motion_state(&self) -> MotionState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<MotionState> {
        self.shared.state.subscribe()
    }

    pub fn snapshot(&self) -> CoveringSnapshot {
        CoveringSnapshot {
            name: self.name().to_string(),
            current_position: self.current_position(),
            target_position: self.target_position(),
            motion_state: self.motion_state(),
        }
    }

    /// Requests a new target position.
    ///
    /// The target is stored immediately. Pulses and the position simulation run in the
    /// background; transmit failures are logged and reported through the returned
    /// [`PendingCommand`] only.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime and motion is required.
    pub fn set_target(&self, value: u8) -> PendingCommand {
        let shared = &self.shared;
        let name = &shared.profile.name;

        let value = if value > FULLY_OPEN {
            tracing::warn!("{}: target position clamped from {} to {}", name, value, FULLY_OPEN);
            FULLY_OPEN
        } else {
            value
        };

        tracing::debug!("{}: set target position {}", name, value);

        // Without feedback a repeated request for the endstop we believe we are at is
        // read as a full traversal from the opposite endstop.
        let current = shared.current_position();
        if value == FULLY_OPEN && current == FULLY_OPEN {
            tracing::debug!("{}: already fully open, assuming fully closed", name);
            shared.store.set_current_position(FULLY_CLOSED);
        } else if value == FULLY_CLOSED && current == FULLY_CLOSED {
            tracing::debug!("{}: already fully closed, assuming fully open", name);
            shared.store.set_current_position(FULLY_OPEN);
        }

        let current = shared.current_position();
        let direction = if value > current {
            MotionState::Increasing
        } else if value < current {
            MotionState::Decreasing
        } else {
            MotionState::Stopped
        };

        shared.store.set_target_position(value);

        if direction == MotionState::Stopped {
            return match shared.halt_motion() {
                Some((generation, moving)) => {
                    tracing::debug!("{}: target {} reached early, stopping", name, value);
                    let halted = Arc::clone(shared);
                    PendingCommand {
                        handle: Some(tokio::spawn(async move {
                            halted.finish_motion(generation, moving).await;
                            Ok(MotionState::Stopped)
                        })),
                    }
                }
                None => PendingCommand::settled(),
            };
        }

        let generation = shared.cancel_motion();
        let handle = tokio::spawn(Arc::clone(shared).run_sequence(generation, direction));

        PendingCommand {
            handle: Some(handle),
        }
    }
}

impl Shared {
    fn current_position(&self) -> u8 {
        self.store
            .current_position()
            .unwrap_or(FULLY_CLOSED)
            .min(FULLY_OPEN)
    }

    fn target_position(&self) -> u8 {
        self.store
            .target_position()
            .unwrap_or(FULLY_CLOSED)
            .min(FULLY_OPEN)
    }

    fn lock_timer(&self) -> MutexGuard<'_, TimerSlot> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops the live simulation, if any, and opens a new motion generation.
    fn cancel_motion(&self) -> u64 {
        let mut slot = self.lock_timer();

        if let Some(previous) = slot.active.take() {
            previous.abort();
            tracing::debug!(
                "{}: cancelled running simulation at {}",
                self.profile.name,
                self.current_position()
            );
        }

        slot.generation += 1;
        slot.generation
    }

    /// Cancels a live simulation so the stop transition can run at the current estimate.
    /// Returns the new generation and the motion that was running.
    fn halt_motion(&self) -> Option<(u64, MotionState)> {
        let mut slot = self.lock_timer();
        let active = slot.active.take()?;
        active.abort();

        slot.generation += 1;
        Some((slot.generation, *self.state.borrow()))
    }

    /// Open or close sequence: one pulse, then the simulation timer on success.
    async fn run_sequence(self: Arc<Self>, generation: u64, direction: MotionState) -> Result<MotionState> {
        let Some(command) = Command::for_motion(direction) else {
            return Ok(MotionState::Stopped);
        };

        match self.radio.enqueue(self.profile.payload(command)).await {
            Ok(()) => {
                tracing::debug!(
                    "{}: successfully enqueued {} command",
                    self.profile.name,
                    command.as_str()
                );

                if self.begin_motion(generation, direction) {
                    Ok(direction)
                } else {
                    tracing::warn!(
                        "{}: {} command acknowledged after a newer target was set",
                        self.profile.name,
                        command.as_str()
                    );
                    Err(CoveringError::Superseded)
                }
            }
            Err(e) => {
                tracing::error!(
                    "{}: failed to enqueue {} command: {}",
                    self.profile.name,
                    command.as_str(),
                    e
                );
                self.abandon_motion(generation);
                Err(e.into())
            }
        }
    }

    fn begin_motion(self: &Arc<Self>, generation: u64, direction: MotionState) -> bool {
        let Some(period) = self.profile.tick_interval(direction) else {
            return false;
        };

        let mut slot = self.lock_timer();
        if slot.generation != generation {
            return false;
        }

        self.state.send_replace(direction);
        slot.active = Some(tokio::spawn(run_motion(
            Arc::downgrade(self),
            generation,
            direction,
            period,
        )));

        true
    }

    /// The pulse of this generation failed. A simulation cancelled to make room for it
    /// is not coming back, so a covering believed to be moving is now believed stopped.
    fn abandon_motion(&self, generation: u64) {
        let slot = self.lock_timer();
        if slot.generation != generation || !self.state.borrow().is_moving() {
            return;
        }

        self.state.send_replace(MotionState::Stopped);
        tracing::warn!(
            "{}: previous motion cancelled, assuming stopped at {}",
            self.profile.name,
            self.current_position()
        );
    }

    /// Advances the estimate by one percent. Returns true once the target is reached.
    fn step(&self, direction: MotionState) -> bool {
        let current = self.current_position();
        let target = self.target_position();

        let (next, reached) = match direction {
            MotionState::Increasing => {
                let next = current.saturating_add(1).min(FULLY_OPEN);
                (next, next >= target)
            }
            MotionState::Decreasing => {
                let next = current.saturating_sub(1);
                (next, next <= target)
            }
            MotionState::Stopped => (current, true),
        };

        self.store.set_current_position(next);
        tracing::debug!("{}: {} position to {}", self.profile.name, direction.as_str(), next);

        reached
    }

    /// Detaches the finished timer without aborting it; the caller is that timer.
    fn release_timer(&self, generation: u64) {
        let mut slot = self.lock_timer();
        if slot.generation == generation {
            slot.active = None;
        }
    }

    /// Stop transition once the estimate has reached the target.
    async fn finish_motion(&self, generation: u64, direction: MotionState) {
        let name = &self.profile.name;

        if let Some(endstop) = direction.endstop() {
            if self.target_position() == endstop {
                self.store.set_current_position(endstop);

                if !self.profile.sends_stop_at(endstop) {
                    self.settle(generation);
                    tracing::info!(
                        "{}: fully {}",
                        name,
                        if endstop == FULLY_OPEN { "open" } else { "closed" }
                    );
                    return;
                }
            }
        }

        match self.radio.enqueue(self.profile.payload(Command::Stop)).await {
            Ok(()) => tracing::debug!("{}: successfully enqueued stop command", name),
            Err(e) => tracing::error!("{}: failed to enqueue stop command: {}", name, e),
        }

        self.settle(generation);
        tracing::info!("{}: stopped at {}", name, self.current_position());
    }

    fn settle(&self, generation: u64) {
        let slot = self.lock_timer();
        if slot.generation == generation {
            self.state.send_replace(MotionState::Stopped);
        } else {
            tracing::debug!(
                "{}: newer motion in progress, keeping {}",
                self.profile.name,
                self.state.borrow().as_str()
            );
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let slot = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = slot.active.take() {
            active.abort();
        }
    }
}

/// Periodic simulation tick. Holds the controller weakly so a dropped controller ends it.
async fn run_motion(shared: Weak<Shared>, generation: u64, direction: MotionState, period: Duration) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(shared) = shared.upgrade() else {
            return;
        };

        if shared.step(direction) {
            shared.release_timer(generation);
            shared.finish_motion(generation, direction).await;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::mock::RecordingRadio;
    use crate::profile::CommandSet;
    use crate::store::MemoryStore;

    use super::*;

    fn controller(store: Arc<MemoryStore>) -> (CoveringController, Arc<RecordingRadio>) {
        let radio = Arc::new(RecordingRadio::new());
        let profile = DeviceProfile::new(
            "Bedroom",
            10.0,
            10.0,
            CommandSet {
                open: vec![0xb2, 0x01],
                close: vec![0xb2, 0x02],
                stop: vec![0xb2, 0x03],
            },
        );
        let controller = CoveringController::new(profile, radio.clone(), store).unwrap();

        (controller, radio)
    }

    #[tokio::test]
    async fn test_unset_positions_read_as_closed() {
        let (controller, _) = controller(Arc::new(MemoryStore::new()));

        assert_eq!(controller.current_position(), 0);
        assert_eq!(controller.target_position(), 0);
        assert_eq!(controller.motion_state(), MotionState::Stopped);
    }

    #[tokio::test]
    async fn test_equal_target_starts_nothing() {
        let store = Arc::new(MemoryStore::with_positions(40, 10));
        let (controller, radio) = controller(store);

        let pending = controller.set_target(40);

        assert!(pending.is_settled());
        assert_eq!(pending.wait().await.unwrap(), MotionState::Stopped);
        assert_eq!(controller.target_position(), 40);
        assert_eq!(radio.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_target_is_clamped() {
        let store = Arc::new(MemoryStore::with_positions(50, 50));
        let (controller, radio) = controller(store);

        let pending = controller.set_target(180);

        assert_eq!(controller.target_position(), 100);
        assert_eq!(pending.wait().await.unwrap(), MotionState::Increasing);
        assert_eq!(radio.sent(), vec![vec![0xb2, 0x01]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_close_at_closed_reverses_endstop() {
        let store = Arc::new(MemoryStore::with_positions(0, 0));
        let (controller, radio) = controller(store.clone());

        let pending = controller.set_target(0);

        assert_eq!(store.current_position(), Some(100));
        assert_eq!(pending.wait().await.unwrap(), MotionState::Decreasing);
        assert_eq!(controller.motion_state(), MotionState::Decreasing);
        assert_eq!(radio.sent(), vec![vec![0xb2, 0x02]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_saturates_at_bounds() {
        let store = Arc::new(MemoryStore::with_positions(100, 100));
        let (controller, _) = controller(store.clone());

        assert!(controller.shared.step(MotionState::Increasing));
        assert_eq!(store.current_position(), Some(100));

        store.set_current_position(0);
        store.set_target_position(0);
        assert!(controller.shared.step(MotionState::Decreasing));
        assert_eq!(store.current_position(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_serializes_state() {
        let store = Arc::new(MemoryStore::with_positions(20, 60));
        let (controller, _) = controller(store);

        let snapshot = controller.snapshot();
        assert_eq!(
            snapshot,
            CoveringSnapshot {
                name: "Bedroom".to_string(),
                current_position: 20,
                target_position: 60,
                motion_state: MotionState::Stopped,
            }
        );
    }
}
