use chrono::Duration;
use sextant_core::Timestamp;
use sextant_ports::Clock;
use std::sync::RwLock;

/// Frozen clock that only moves when explicitly told to
///
/// Lets tests drive the market-hours gate and scheduler through specific
/// times without real wall-clock waiting.
pub struct FixedClock {
    current: RwLock<Timestamp>,
}

impl FixedClock {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, time: Timestamp) {
        *self.current.write().expect("clock lock poisoned") = time;
    }

    /// Move forward by a duration
    pub fn advance(&self, by: Duration) {
        let mut guard = self.current.write().expect("clock lock poisoned");
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.current.read().expect("clock lock poisoned")
    }

    fn name(&self) -> &str {
        "FixedClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_fixed_clock_only_moves_on_command() {
        let start = Utc.with_ymd_and_hms(2025, 3, 12, 13, 0, 0).unwrap();
        let clock = FixedClock::new(start);

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), start + Duration::minutes(5));

        let later = Utc.with_ymd_and_hms(2025, 3, 13, 9, 30, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
