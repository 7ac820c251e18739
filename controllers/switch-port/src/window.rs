//! Reservation window evaluation for deletion events.

use chrono::{DateTime, Utc};

/// Whether `now` falls inside the half-open reservation window `[start, end)`
pub fn is_active(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start <= now && now < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_inside_window() {
        assert!(is_active(at(10), at(9), at(11)));
    }

    #[test]
    fn test_window_boundaries() {
        assert!(is_active(at(9), at(9), at(11)));
        assert!(!is_active(at(11), at(9), at(11)));
        assert!(is_active(at(11) - Duration::microseconds(1), at(9), at(11)));
    }

    #[test]
    fn test_outside_window() {
        assert!(!is_active(at(8), at(9), at(11)));
        assert!(!is_active(at(12), at(9), at(11)));
    }

    #[test]
    fn test_empty_window_is_never_active() {
        assert!(!is_active(at(9), at(9), at(9)));
    }
}
