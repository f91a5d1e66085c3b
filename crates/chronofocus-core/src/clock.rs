//! Wall-clock seam.
//!
//! The engine never reads `SystemTime` directly; it asks its [`Clock`],
//! so hosts with their own scheduler (and tests) can drive time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

/// Source of wall-clock time for the engine.
pub trait Clock: Send {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Current instant as a chrono timestamp.
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_ms() as i64).unwrap_or_default()
    }

    /// Current UTC calendar date. Streak and day-counter bookkeeping is
    /// keyed on UTC dates so the same session resolves identically on
    /// every host.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// System clock - uses real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually driven clock for tests and embedded hosts.
///
/// Clones share the same underlying instant, so a test can keep a handle
/// while the engine owns its own copy.
#[derive(Debug, Default, Clone)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(epoch_ms: u64) -> Self {
        Self(Arc::new(AtomicU64::new(epoch_ms)))
    }

    pub fn set_ms(&self, epoch_ms: u64) {
        self.0.store(epoch_ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.0.fetch_add(secs * 1000, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance_secs(3);
        assert_eq!(clock.now_ms(), 4_000);
    }

    #[test]
    fn clones_share_the_instant() {
        let clock = ManualClock::new(0);
        let handle = clock.clone();
        handle.advance_ms(250);
        assert_eq!(clock.now_ms(), 250);
    }

    #[test]
    fn today_derives_from_now_ms() {
        // 2024-03-01T12:00:00Z
        let clock = ManualClock::new(1_709_294_400_000);
        assert_eq!(clock.today().to_string(), "2024-03-01");
    }
}
