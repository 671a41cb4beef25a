use std::time::Instant;

/// A trait for time sources that return a monotonic timestamp in
/// milliseconds.
///
/// The origin is arbitrary; only differences between two readings are
/// meaningful. This abstraction allows the progress tracker to run against a
/// real clock in production and a manually advanced clock in tests.
///
/// # Example
///
/// ```
/// use pregen::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
pub trait TimeSource: Send + Sync + 'static {
    /// Returns the current time in milliseconds since the source's origin.
    fn current_millis(&self) -> u64;
}

/// A monotonic time source measuring elapsed time since construction.
///
/// Backed by [`Instant`], so readings never go backward even if the wall
/// clock is adjusted (NTP, daylight savings) while a task is running.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let mut last = clock.current_millis();
        for _ in 0..1000 {
            let now = clock.current_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock::new();
        let before = clock.current_millis();
        std::thread::sleep(std::time::Duration::from_millis(15));
        assert!(clock.current_millis() >= before + 10);
    }
}
