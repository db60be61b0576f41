//! Injectable time source.
//!
//! Timestamps are threaded through constructors rather than read directly
//! from the system clock, so tests never need to sleep on wall-clock time
//! to exercise TTL or age-based logic.

use chrono::{DateTime, Utc};

/// Supplies the current time.
///
/// Production code uses [`SystemClock`]; tests use [`FixedClock`] to pin
/// "now" and advance it deterministically.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// A clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that returns a fixed, externally advanceable time.
///
/// Useful for TTL and age-based tests where the test needs to assert
/// exact expiry behavior without sleeping.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: std::sync::Arc<std::sync::atomic::AtomicI64>,
}

impl FixedClock {
    /// Creates a fixed clock pinned at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Arc::new(std::sync::atomic::AtomicI64::new(
                now.timestamp_millis(),
            )),
        }
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: chrono::Duration) {
        self.now
            .fetch_add(delta.num_milliseconds(), std::sync::atomic::Ordering::SeqCst);
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, now: DateTime<Utc>) {
        self.now
            .store(now.timestamp_millis(), std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.now.load(std::sync::atomic::Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_advances_over_time() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn fixed_clock_holds_value_until_advanced() {
        let base = Utc::now();
        let clock = FixedClock::new(base);
        assert_eq!(clock.now().timestamp_millis(), base.timestamp_millis());

        clock.advance(chrono::Duration::milliseconds(500));
        assert_eq!(
            clock.now().timestamp_millis(),
            base.timestamp_millis() + 500
        );
    }

    #[test]
    fn fixed_clock_set_overrides_absolute_time() {
        let clock = FixedClock::new(Utc::now());
        let target = Utc::now() + chrono::Duration::hours(25);
        clock.set(target);
        assert_eq!(clock.now().timestamp_millis(), target.timestamp_millis());
    }
}
