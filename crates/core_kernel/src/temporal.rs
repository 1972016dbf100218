//! Effective-date handling for reference data
//!
//! Coverage rules, tariffs, and enrollments are all valid for a window of
//! calendar dates. Evaluation happens against the date a charge was raised,
//! bucketed into the facility's local calendar day.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use std::str::FromStr;

/// Timezone wrapper for the facility's local calendar
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tz::from_str(&s)
            .map(Timezone)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timezone: {}", s)))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// The calendar date a UTC instant falls on in this timezone
    ///
    /// Charges carry UTC timestamps; rule and tariff windows are whole
    /// local days, so evaluation dates come through here.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Africa::Accra)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid window: from {from} must not be after to {to}")]
    InvalidWindow { from: NaiveDate, to: NaiveDate },
}

/// An inclusive window of calendar dates over which reference data applies
///
/// Both bounds are optional: `from = None` means "since forever" and
/// `to = None` means "until further notice", matching how plans, rules, and
/// tariffs are configured in practice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveWindow {
    /// First date the data applies (inclusive), None means unbounded
    pub from: Option<NaiveDate>,
    /// Last date the data applies (inclusive), None means unbounded
    pub to: Option<NaiveDate>,
}

impl EffectiveWindow {
    /// Creates a new window, rejecting an inverted pair of bounds
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, TemporalError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(TemporalError::InvalidWindow { from, to });
            }
        }
        Ok(Self { from, to })
    }

    /// A window open on both ends
    pub fn unbounded() -> Self {
        Self { from: None, to: None }
    }

    /// A window starting on a given date, open-ended
    pub fn starting(from: NaiveDate) -> Self {
        Self { from: Some(from), to: None }
    }

    /// Whether the window covers the given date
    pub fn contains(&self, date: NaiveDate) -> bool {
        let after_start = self.from.map_or(true, |from| from <= date);
        let before_end = self.to.map_or(true, |to| date <= to);
        after_start && before_end
    }

    /// Whether two windows share at least one date
    pub fn overlaps(&self, other: &EffectiveWindow) -> bool {
        let starts_before_other_ends = match (self.from, other.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        };
        let other_starts_before_self_ends = match (other.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_contains_inclusive_bounds() {
        let window =
            EffectiveWindow::new(Some(date(2024, 1, 1)), Some(date(2024, 12, 31))).unwrap();

        assert!(window.contains(date(2024, 1, 1)));
        assert!(window.contains(date(2024, 12, 31)));
        assert!(!window.contains(date(2025, 1, 1)));
    }

    #[test]
    fn test_open_ended_window() {
        let window = EffectiveWindow::starting(date(2024, 6, 1));

        assert!(window.contains(date(2030, 1, 1)));
        assert!(!window.contains(date(2024, 5, 31)));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let result = EffectiveWindow::new(Some(date(2024, 12, 31)), Some(date(2024, 1, 1)));
        assert!(result.is_err());
    }

    #[test]
    fn test_overlap_detection() {
        let a = EffectiveWindow::new(Some(date(2024, 1, 1)), Some(date(2024, 6, 30))).unwrap();
        let b = EffectiveWindow::new(Some(date(2024, 6, 30)), Some(date(2024, 12, 31))).unwrap();
        let c = EffectiveWindow::new(Some(date(2024, 7, 1)), None).unwrap();

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&c));
        assert!(!a.overlaps(&c));
        assert!(EffectiveWindow::unbounded().overlaps(&a));
    }

    #[test]
    fn test_local_date_bucketing() {
        let tz = Timezone::default();
        let instant = "2024-03-15T23:30:00Z".parse::<DateTime<Utc>>().unwrap();

        // Accra is UTC+0, so the local date matches the UTC date
        assert_eq!(tz.local_date(instant), date(2024, 3, 15));
    }
}
