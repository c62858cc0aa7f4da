use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

const SECONDS_PER_HOUR: i64 = 3600;

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AppError> {
        if end <= start {
            return Err(AppError::Validation(
                "end time must be after start time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Strict intersection: intervals that only touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    pub fn duration_hours(&self) -> Decimal {
        Decimal::from(self.duration_seconds()) / Decimal::from(SECONDS_PER_HOUR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_rejects_inverted_and_empty() {
        assert!(Interval::new(at(12, 0), at(10, 0)).is_err());
        assert!(Interval::new(at(10, 0), at(10, 0)).is_err());
    }

    #[test]
    fn test_adjacent_intervals_do_not_overlap() {
        let a = Interval::new(at(10, 0), at(11, 0)).unwrap();
        let b = Interval::new(at(11, 0), at(12, 0)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_partial_and_containing_overlap() {
        let a = Interval::new(at(10, 0), at(12, 0)).unwrap();
        assert!(a.overlaps(&Interval::new(at(11, 0), at(13, 0)).unwrap()));
        assert!(a.overlaps(&Interval::new(at(10, 30), at(11, 0)).unwrap()));
        assert!(a.overlaps(&Interval::new(at(9, 0), at(13, 0)).unwrap()));
    }

    #[test]
    fn test_duration_hours_keeps_fractions() {
        let a = Interval::new(at(10, 0), at(11, 30)).unwrap();
        assert_eq!(a.duration_hours(), dec!(1.5));
    }
}
