use std::time::{Duration, Instant};

/// Repeating timer driven by the UI frame loop.
///
/// Fires at most once per period; a late poll fires once and reschedules
/// from the poll time rather than catching up.
#[derive(Debug)]
pub struct RefreshTimer {
    period: Duration,
    next_due: Instant,
}

impl RefreshTimer {
    pub fn start(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    /// Returns true when the timer has elapsed, rescheduling it
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.period;
        true
    }

    /// Time left until the next tick, for scheduling a repaint
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(100);

    #[test]
    fn test_does_not_fire_early() {
        let start = Instant::now();
        let mut timer = RefreshTimer::start(PERIOD, start);

        assert!(!timer.poll(start));
        assert!(!timer.poll(start + Duration::from_millis(99)));
        assert!(timer.poll(start + PERIOD));
    }

    #[test]
    fn test_fires_once_per_period() {
        let start = Instant::now();
        let mut timer = RefreshTimer::start(PERIOD, start);

        let late = start + Duration::from_millis(350);
        assert!(timer.poll(late));
        assert!(!timer.poll(late + Duration::from_millis(50)));
        assert!(timer.poll(late + PERIOD));
    }

    #[test]
    fn test_remaining() {
        let start = Instant::now();
        let timer = RefreshTimer::start(PERIOD, start);

        assert_eq!(timer.remaining(start + Duration::from_millis(40)), Duration::from_millis(60));
        assert_eq!(timer.remaining(start + Duration::from_secs(1)), Duration::ZERO);
    }
}
