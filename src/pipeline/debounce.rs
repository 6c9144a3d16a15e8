//! Polled trailing-edge debouncer.
//!
//! Nothing here owns a timer: callers pass the current time in
//! milliseconds to [`Debouncer::queue`] and [`Debouncer::take_ready`], which
//! keeps the type deterministic under test.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

/// Default idle delay before a render fires.
pub const DEFAULT_DELAY_MS: u64 = 150;
/// Bounds for a configured render delay.
pub const MIN_DELAY_MS: u64 = 100;
pub const MAX_DELAY_MS: u64 = 200;

/// Clamp a configured render delay into the supported window.
pub fn clamp_delay_ms(delay_ms: Option<u64>) -> u64 {
    delay_ms
        .unwrap_or(DEFAULT_DELAY_MS)
        .clamp(MIN_DELAY_MS, MAX_DELAY_MS)
}

/// Debounces each key independently.
#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay_ms: u64,
    pending: HashMap<K, u64>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self::with_delay_ms(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn with_delay_ms(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: HashMap::new(),
        }
    }

    pub const fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Record activity for `key`; restarts its quiet period.
    pub fn queue(&mut self, key: K, now_ms: u64) {
        self.pending.insert(key, now_ms);
    }

    pub fn cancel(&mut self, key: &K) {
        self.pending.remove(key);
    }

    /// Keys whose quiet period has elapsed. Each is returned once.
    pub fn take_ready(&mut self, now_ms: u64) -> Vec<K> {
        let delay = self.delay_ms;
        let ready: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, queued_at)| now_ms.saturating_sub(**queued_at) >= delay)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &ready {
            self.pending.remove(key);
        }
        ready
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Milliseconds until the earliest pending key fires.
    pub fn time_until_ready(&self, now_ms: u64) -> Option<u64> {
        self.pending
            .values()
            .map(|queued_at| (queued_at + self.delay_ms).saturating_sub(now_ms))
            .min()
    }
}

/// Debouncer for a single stream of edits.
pub type EditDebouncer = Debouncer<()>;

impl EditDebouncer {
    pub fn edit(&mut self, now_ms: u64) {
        self.queue((), now_ms);
    }

    pub fn take_edit_ready(&mut self, now_ms: u64) -> bool {
        !self.take_ready(now_ms).is_empty()
    }
}
