use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock used by the cycle loop, the stability timer and the
/// calibration settle delays.
///
/// - now(): returns a monotonic Instant
/// - sleep(): blocks for the provided duration (implementations may simulate)
/// - ms_since(): elapsed milliseconds from an epoch Instant (boot time)
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;

    /// Deterministic clock for tests; time only moves when advanced.
    ///
    /// now() = origin + offset
    /// sleep(d) advances internal time by d without actually sleeping, so a
    /// paced loop or a calibration settle delay costs no wall time.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: std::sync::Arc<std::sync::Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: std::sync::Arc::new(std::sync::Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.origin + off
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn test_clock_sleep_advances_without_blocking() {
        let clock = TestClock::new();
        let epoch = clock.now();
        clock.sleep(Duration::from_millis(700));
        assert_eq!(clock.ms_since(epoch), 700);
        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.ms_since(epoch), 705);
    }

    #[test]
    fn ms_since_saturates_for_future_epoch() {
        let clock = TestClock::new();
        let later = clock.now() + Duration::from_secs(1);
        assert_eq!(clock.ms_since(later), 0);
    }

    #[test]
    fn clones_share_time() {
        let a = TestClock::new();
        let b = a.clone();
        let epoch = a.now();
        b.advance(Duration::from_millis(20));
        assert_eq!(a.ms_since(epoch), 20);
    }
}
