use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::radio::{RadioError, RadioLink};

/// Radio double that records accepted payloads and fails on demand.
#[derive(Debug, Default)]
pub struct RecordingRadio {
    sent: Mutex<Vec<Vec<u8>>>,
    refused: Mutex<Vec<Vec<u8>>>,
    attempts: AtomicUsize,
    fail_next: AtomicUsize,
    latency: Mutex<Duration>,
}

impl RecordingRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        let radio = Self::default();
        radio.set_latency(latency);
        radio
    }

    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// Fail the next `count` transmissions regardless of payload.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Always reject this payload.
    pub fn refuse(&self, payload: &[u8]) {
        lock(&self.refused).push(payload.to_vec());
    }

    pub fn accept(&self, payload: &[u8]) {
        lock(&self.refused).retain(|refused| refused != payload);
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        lock(&self.sent).clone()
    }

    pub fn count_of(&self, payload: &[u8]) -> usize {
        lock(&self.sent)
            .iter()
            .filter(|sent| sent.as_slice() == payload)
            .count()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RadioLink for RecordingRadio {
    async fn enqueue(&self, payload: &[u8]) -> Result<(), RadioError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let latency = *lock(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RadioError::Unavailable);
        }

        if lock(&self.refused).iter().any(|refused| refused == payload) {
            return Err(RadioError::Rejected(format!("{} byte payload", payload.len())));
        }

        lock(&self.sent).push(payload.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_keeps_recording_after_a_panicking_holder() {
        let radio = Arc::new(RecordingRadio::new());

        let holder = Arc::clone(&radio);
        let _ = std::thread::spawn(move || {
            let _sent = holder.sent.lock();
            panic!("holder panicked");
        })
        .join();
        assert!(radio.sent.is_poisoned());

        radio.enqueue(&[0x01]).await.unwrap();

        assert_eq!(radio.sent(), vec![vec![0x01]]);
        assert_eq!(radio.count_of(&[0x01]), 1);
    }
}
