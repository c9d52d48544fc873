use std::time::{Duration, Instant};

/// Clock the session reads timestamps from and applies delays through
pub trait Timer {
    /// Milliseconds since the timer started.
    fn now_ms(&self) -> u64;
    fn sleep(&mut self, d: Duration);

    fn elapsed_ms(&self, since_ms: u64) -> u64 {
        self.now_ms().saturating_sub(since_ms)
    }
}

/// Wall-clock timer backed by the OS monotonic clock
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
}

impl Timer for HighPrecisionTimer {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep(&mut self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

        let mut req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut rem = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // Resume with the remaining time when a signal interrupts the sleep
        loop {
            let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) };
            if rc != libc::EINTR {
                break;
            }
            req = rem;
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Virtual clock: `sleep` advances time instantly and is logged.
///
/// Used for headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ms: u64,
    sleeps: Vec<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, d: Duration) {
        self.now_ms += d.as_millis() as u64;
    }

    /// Every delay applied through `sleep`, in order.
    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }
}

impl Timer for ManualTimer {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn sleep(&mut self, d: Duration) {
        self.sleeps.push(d);
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_timer_advances_on_sleep() {
        let mut timer = ManualTimer::new();
        timer.advance(Duration::from_millis(250));
        timer.sleep(Duration::from_millis(1200));
        assert_eq!(timer.now_ms(), 1450);
        assert_eq!(timer.sleeps(), &[Duration::from_millis(1200)]);
        assert_eq!(timer.elapsed_ms(450), 1000);
    }

    #[test]
    fn high_precision_sleep_waits_at_least_requested() {
        let mut timer = HighPrecisionTimer::new();
        let before = Instant::now();
        timer.sleep(Duration::from_millis(5));
        assert!(before.elapsed() >= Duration::from_millis(5));
    }
}
