//! Small time helpers shared across crates

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Start of the calendar month containing `at`, in UTC
///
/// Used for the calendar-month fee aggregation window.
pub fn month_start(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0)
        .single()
        .expect("first of month is always a valid timestamp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_start_truncates() {
        let at = Utc.with_ymd_and_hms(2025, 3, 17, 14, 30, 5).unwrap();
        let start = month_start(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_start_idempotent() {
        let first = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(month_start(first), first);
    }
}
