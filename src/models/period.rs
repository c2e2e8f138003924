//! Calendar month and year helpers
//!
//! Income, fixed expenses, loan balances and investment values are all keyed
//! by (year, month); reports are keyed by year.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TrackerError, TrackerResult};

/// Smallest year accepted anywhere in the API
pub const MIN_YEAR: i32 = 1900;
/// Largest year accepted anywhere in the API
pub const MAX_YEAR: i32 = 9999;

/// A calendar month (e.g. 2025-03)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Create a month, validating both components
    pub fn new(year: i32, month: u32) -> TrackerResult<Self> {
        validate_year(year)?;
        if !(1..=12).contains(&month) {
            return Err(TrackerError::Validation(format!(
                "Month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current local month
    pub fn current() -> Self {
        Self::of(chrono::Local::now().date_naive())
    }

    /// Parse "YYYY-MM"
    pub fn parse(s: &str) -> TrackerResult<Self> {
        let invalid =
            || TrackerError::Validation(format!("Invalid month '{}'. Use YYYY-MM (e.g., 2025-01)", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day() - Duration::days(1)
    }

    /// Clamp a day-of-month to this month (31 in February becomes 28/29)
    pub fn day(&self, day: u32) -> NaiveDate {
        let last = self.last_day();
        let day = day.clamp(1, last.day());
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or(last)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Validate a report year
pub fn validate_year(year: i32) -> TrackerResult<()> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(TrackerError::Validation(format!(
            "Year must be between {} and {}, got {}",
            MIN_YEAR, MAX_YEAR, year
        )))
    }
}

/// Inclusive date bounds of a calendar year
pub fn year_bounds(year: i32) -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN),
        NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX),
    )
}

/// Week of month (1..=5) a date falls in, counting 7-day blocks from the 1st
pub fn week_of_month(date: NaiveDate) -> u8 {
    ((date.day() - 1) / 7 + 1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let ym = YearMonth::parse("2025-03").unwrap();
        assert_eq!(ym, YearMonth { year: 2025, month: 3 });
        assert_eq!(ym.to_string(), "2025-03");
        assert!(YearMonth::parse("2025-13").is_err());
        assert!(YearMonth::parse("March").is_err());
    }

    #[test]
    fn test_month_bounds() {
        let feb = YearMonth::new(2024, 2).unwrap();
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(feb.day(31), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(feb.contains(NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()));
    }

    #[test]
    fn test_navigation_wraps_years() {
        let jan = YearMonth::new(2025, 1).unwrap();
        assert_eq!(jan.previous(), YearMonth { year: 2024, month: 12 });
        assert_eq!(jan.previous().next(), jan);
    }

    #[test]
    fn test_week_of_month() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        assert_eq!(week_of_month(d(1)), 1);
        assert_eq!(week_of_month(d(7)), 1);
        assert_eq!(week_of_month(d(8)), 2);
        assert_eq!(week_of_month(d(29)), 5);
    }

    #[test]
    fn test_validate_year() {
        assert!(validate_year(2025).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(10000).is_err());
    }
}
