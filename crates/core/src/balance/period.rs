//! Monthly period keys.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

/// Calendar month a balance change is booked in, written `YYYY-MM`.
///
/// Ordering is chronological.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

/// Malformed period key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid period key '{0}', expected YYYY-MM")]
pub struct InvalidPeriodKey(pub String);

impl PeriodKey {
    /// Builds a key, rejecting months outside 1..=12.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodKey` for an out-of-range month.
    pub fn new(year: i32, month: u32) -> Result<Self, InvalidPeriodKey> {
        if (1..=12).contains(&month) {
            Ok(Self { year, month })
        } else {
            Err(InvalidPeriodKey(format!("{year:04}-{month:02}")))
        }
    }

    /// Period containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Month, 1-based.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First day of the month. `None` outside chrono's date range.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = InvalidPeriodKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPeriodKey(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_date() {
        let key = PeriodKey::from_date(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(key.to_string(), "2024-03");
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 3);
        assert_eq!(key.first_day(), NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_ordering_is_chronological() {
        let dec: PeriodKey = "2023-12".parse().unwrap();
        let jan: PeriodKey = "2024-01".parse().unwrap();
        let feb: PeriodKey = "2024-02".parse().unwrap();
        assert!(dec < jan);
        assert!(jan < feb);
    }

    #[rstest]
    #[case("2024-13")]
    #[case("2024-00")]
    #[case("2024-1")]
    #[case("24-01")]
    #[case("2024/01")]
    #[case("")]
    fn test_rejects_malformed(#[case] raw: &str) {
        assert!(raw.parse::<PeriodKey>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let key: PeriodKey = "2024-07".parse().unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2024-07\"");
        let back: PeriodKey = serde_json::from_str("\"2024-07\"").unwrap();
        assert_eq!(back, key);
    }
}
