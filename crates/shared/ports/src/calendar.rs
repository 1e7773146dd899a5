use chrono::{Datelike, NaiveTime, Weekday};
use sextant_core::Timestamp;

/// Port for the trading calendar
///
/// The engine never proposes or evaluates trades outside the window this
/// reports as open.
pub trait MarketCalendar: Send + Sync {
    fn is_open(&self, timestamp: Timestamp) -> bool;
}

/// Weekday session calendar: open Monday-Friday between fixed times.
///
/// Timestamps are interpreted in the exchange's local time; callers feed
/// this clock readings already shifted to that zone.
#[derive(Debug, Clone)]
pub struct WeekdayCalendar {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for WeekdayCalendar {
    fn default() -> Self {
        // US equities regular session
        Self {
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        }
    }
}

impl MarketCalendar for WeekdayCalendar {
    fn is_open(&self, timestamp: Timestamp) -> bool {
        let weekday = matches!(
            timestamp.weekday(),
            Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri
        );
        let time = timestamp.time();
        weekday && time >= self.open && time <= self.close
    }
}
