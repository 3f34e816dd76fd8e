//! Publication dates, the date window, and the ordered date parsers.
//!
//! Sources report dates in every shape imaginable: RFC 3339 timestamps,
//! `YYYYMMDD` stamps, "Mar 2023" blurbs, or a bare year. [`resolve`] runs an
//! ordered list of [`DateStrategy`] implementations over a piece of text and
//! keeps the first hit, remembering how precise the hit was so the window
//! check never claims more precision than the source gave.

use crate::error::{DateError, FetchError};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::trace;

static ISO_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\d])(\d{4})-(\d{1,2})-(\d{1,2})(?:[^\d]|$)").unwrap());
static ISO_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{4})-(\d{1,2})\s*$").unwrap());
static COMPACT_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\d])(\d{4})(\d{2})(\d{2})(?:[^\d]|$)").unwrap());
static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\.?\s+(\d{4})\b",
    )
    .unwrap()
});
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(1\d{3}|2\d{3})\b").unwrap());

/// How much of a [`PublishedOn`] date the source actually reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

/// A resolved publication date.
///
/// Month and year precision dates are stored normalized to the first day of
/// the period, so a year-only date compares as January 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublishedOn {
    date: NaiveDate,
    precision: DatePrecision,
}

impl PublishedOn {
    pub fn on_day(date: NaiveDate) -> Self {
        Self {
            date,
            precision: DatePrecision::Day,
        }
    }

    pub fn in_month(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|date| Self {
            date,
            precision: DatePrecision::Month,
        })
    }

    pub fn in_year(year: i32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, 1, 1).map(|date| Self {
            date,
            precision: DatePrecision::Year,
        })
    }

    /// Most precise valid date for the given parts.
    ///
    /// An invalid day falls back to the month, an invalid month to the year.
    pub fn from_parts(year: i32, month: Option<u32>, day: Option<u32>) -> Option<Self> {
        if let (Some(m), Some(d)) = (month, day)
            && let Some(date) = NaiveDate::from_ymd_opt(year, m, d)
        {
            return Some(Self::on_day(date));
        }
        month
            .and_then(|m| Self::in_month(year, m))
            .or_else(|| Self::in_year(year))
    }

    /// The normalized date used for comparisons and reports.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The full calendar date, only when the source reported a day.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        (self.precision == DatePrecision::Day).then_some(self.date)
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Inclusive collection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FetchError> {
        if start > end {
            return Err(FetchError::invalid(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start.year()..=self.end.year()
    }

    /// Whether `published` falls inside the window, compared at the
    /// precision the source reported.
    pub fn contains(&self, published: &PublishedOn) -> bool {
        if !self.years().contains(&published.year()) {
            return false;
        }
        match published.precision() {
            DatePrecision::Year => true,
            DatePrecision::Month => {
                let month = (published.year(), published.date().month());
                (self.start.year(), self.start.month()) <= month
                    && month <= (self.end.year(), self.end.month())
            }
            DatePrecision::Day => self.start <= published.date() && published.date() <= self.end,
        }
    }
}

/// One way of reading a date out of free text.
pub trait DateStrategy {
    fn name(&self) -> &'static str;

    fn parse(&self, text: &str) -> Option<PublishedOn>;
}

/// `2023-05-04`, `2023-05-04T12:00:00Z`, `20230504` and `2023-05`.
pub struct IsoDate;

impl DateStrategy for IsoDate {
    fn name(&self) -> &'static str {
        "iso"
    }

    fn parse(&self, text: &str) -> Option<PublishedOn> {
        if let Some(found) = ISO_DAY.captures(text).and_then(day_from_captures) {
            return Some(found);
        }
        if let Some(found) = COMPACT_DAY.captures(text).and_then(day_from_captures) {
            return Some(found);
        }
        let caps = ISO_MONTH.captures(text)?;
        PublishedOn::in_month(caps[1].parse().ok()?, caps[2].parse().ok()?)
    }
}

fn day_from_captures(caps: regex::Captures<'_>) -> Option<PublishedOn> {
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(PublishedOn::on_day)
}

/// `March 2023`, `Mar. 2023`, `sept 2021`.
pub struct MonthYear;

impl DateStrategy for MonthYear {
    fn name(&self) -> &'static str {
        "month-year"
    }

    fn parse(&self, text: &str) -> Option<PublishedOn> {
        let caps = MONTH_YEAR.captures(text)?;
        PublishedOn::in_month(caps[2].parse().ok()?, month_number(&caps[1])?)
    }
}

/// Any standalone year between 1000 and 2999.
pub struct BareYear;

impl DateStrategy for BareYear {
    fn name(&self) -> &'static str {
        "year"
    }

    fn parse(&self, text: &str) -> Option<PublishedOn> {
        let caps = BARE_YEAR.captures(text)?;
        PublishedOn::in_year(caps[1].parse().ok()?)
    }
}

/// Resolve `text` with the default strategy order: ISO date, month-year, bare year.
pub fn resolve(text: &str) -> Result<PublishedOn, DateError> {
    resolve_with(&[&IsoDate, &MonthYear, &BareYear], text)
}

/// Try `strategies` in order; the first that parses wins.
pub fn resolve_with(strategies: &[&dyn DateStrategy], text: &str) -> Result<PublishedOn, DateError> {
    strategies
        .iter()
        .find_map(|strategy| {
            let found = strategy.parse(text)?;
            trace!(strategy = strategy.name(), text, "Resolved date");
            Some(found)
        })
        .ok_or_else(|| DateError::Unresolvable(text.trim().to_string()))
}

/// Month number for an English month name, abbreviation, or numeric string.
pub fn month_number(month: &str) -> Option<u32> {
    let month = month.trim().trim_end_matches('.');
    if let Ok(n) = month.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    let lower = month.to_lowercase();
    let n = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_variants() {
        let expected = PublishedOn::on_day(ymd(2023, 5, 4));
        assert_eq!(resolve("2023-05-04").unwrap(), expected);
        assert_eq!(resolve("2023-05-04T12:00:00Z").unwrap(), expected);
        assert_eq!(resolve("2023-05-04T00:00:00+0000").unwrap(), expected);
        assert_eq!(resolve("20230504").unwrap(), expected);
        assert_eq!(
            resolve("2023-05").unwrap(),
            PublishedOn::in_month(2023, 5).unwrap()
        );
    }

    #[test]
    fn test_month_year_text() {
        let on = resolve("Published: March 2021, ACM").unwrap();
        assert_eq!(on.precision(), DatePrecision::Month);
        assert_eq!(on.date(), ymd(2021, 3, 1));

        let on = resolve("Sept. 2019").unwrap();
        assert_eq!(on.date(), ymd(2019, 9, 1));
    }

    #[test]
    fn test_bare_year_normalizes_to_january_first() {
        let on = resolve("Proceedings, vol 12 (2018)").unwrap();
        assert_eq!(on.precision(), DatePrecision::Year);
        assert_eq!(on.date(), ymd(2018, 1, 1));
        assert_eq!(on.calendar_date(), None);
    }

    #[test]
    fn test_invalid_iso_falls_through_to_year() {
        let on = resolve("2023-13-45").unwrap();
        assert_eq!(on, PublishedOn::in_year(2023).unwrap());
    }

    #[test]
    fn test_unresolvable() {
        assert_eq!(
            resolve("  no date here "),
            Err(DateError::Unresolvable("no date here".to_string()))
        );
    }

    #[test]
    fn test_first_strategy_wins() {
        let on = resolve_with(&[&BareYear, &IsoDate], "2020-02-02").unwrap();
        assert_eq!(on.precision(), DatePrecision::Year);
    }

    #[test]
    fn test_from_parts_falls_back() {
        assert_eq!(
            PublishedOn::from_parts(2022, Some(2), Some(30)),
            PublishedOn::in_month(2022, 2)
        );
        assert_eq!(
            PublishedOn::from_parts(2022, Some(13), None),
            PublishedOn::in_year(2022)
        );
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("Jan"), Some(1));
        assert_eq!(month_number("september"), Some(9));
        assert_eq!(month_number("Dec."), Some(12));
        assert_eq!(month_number("07"), Some(7));
        assert_eq!(month_number("13"), None);
        assert_eq!(month_number("Spring"), None);
    }

    #[test]
    fn test_window_rejects_reversed_bounds() {
        assert!(DateWindow::new(ymd(2024, 1, 1), ymd(2023, 1, 1)).is_err());
    }

    #[test]
    fn test_window_precision() {
        let window = DateWindow::new(ymd(2023, 3, 15), ymd(2023, 11, 1)).unwrap();

        assert!(window.contains(&PublishedOn::in_year(2023).unwrap()));
        assert!(!window.contains(&PublishedOn::in_year(2022).unwrap()));

        assert!(window.contains(&PublishedOn::in_month(2023, 3).unwrap()));
        assert!(window.contains(&PublishedOn::in_month(2023, 11).unwrap()));
        assert!(!window.contains(&PublishedOn::in_month(2023, 12).unwrap()));

        assert!(window.contains(&PublishedOn::on_day(ymd(2023, 3, 15))));
        assert!(window.contains(&PublishedOn::on_day(ymd(2023, 11, 1))));
        assert!(!window.contains(&PublishedOn::on_day(ymd(2023, 3, 14))));
        assert!(!window.contains(&PublishedOn::on_day(ymd(2023, 11, 2))));
    }
}
