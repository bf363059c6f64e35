//! Calendar-month arithmetic.
//!
//! Every schedule computation works on whole months. A [`YearMonth`] maps to a
//! single linear month index (`year * 12 + month - 1`) so that stepping by a
//! frequency never goes through day-of-month addition and cannot drift across
//! months of different lengths.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;
const MIN_INDEX: i32 = MIN_YEAR * 12;
const MAX_INDEX: i32 = MAX_YEAR * 12 + 11;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid month {0:?}, expected YYYY-MM")]
pub struct ParseMonthError(pub String);

// ─── YearMonth ───────────────────────────────────────────────────────────────

/// A calendar month bucket. Ordering is chronological.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
  year:  i32,
  month: u32,
}

impl YearMonth {
  /// Returns `None` unless `month` is 1–12 and `year` is 1–9999.
  pub fn new(year: i32, month: u32) -> Option<Self> {
    if (1..=12).contains(&month) && (MIN_YEAR..=MAX_YEAR).contains(&year) {
      Some(Self { year, month })
    } else {
      None
    }
  }

  pub fn from_date(date: NaiveDate) -> Self {
    Self::from_index(date.year() * 12 + date.month0() as i32)
  }

  /// Inverse of [`YearMonth::index`]; clamps to the supported year range.
  pub fn from_index(index: i32) -> Self {
    let index = index.clamp(MIN_INDEX, MAX_INDEX);
    Self {
      year:  index.div_euclid(12),
      month: index.rem_euclid(12) as u32 + 1,
    }
  }

  pub fn index(self) -> i32 { self.year * 12 + self.month as i32 - 1 }

  pub fn year(self) -> i32 { self.year }

  pub fn month(self) -> u32 { self.month }

  pub fn add_months(self, months: i32) -> Self {
    Self::from_index(self.index().saturating_add(months))
  }

  pub fn succ(self) -> Self { self.add_months(1) }

  pub fn pred(self) -> Self { self.add_months(-1) }

  /// Number of months from `self` to `end`, both inclusive. Zero when `end`
  /// precedes `self`.
  pub fn months_until(self, end: YearMonth) -> u32 {
    (end.index() - self.index() + 1).max(0) as u32
  }

  pub fn days_in_month(self) -> u32 {
    match self.month {
      4 | 6 | 9 | 11 => 30,
      2 if is_leap_year(self.year) => 29,
      2 => 28,
      _ => 31,
    }
  }

  /// The given day of this month, clamped to the month's length (a due day of
  /// 31 lands on the 30th in April and on the 28th/29th in February).
  pub fn day(self, day: u32) -> NaiveDate {
    let day = day.clamp(1, self.days_in_month());
    NaiveDate::from_ymd_opt(self.year, self.month, day)
      // The year is clamped to 1..=9999, so this never falls back.
      .unwrap_or(NaiveDate::MAX)
  }

  pub fn first_day(self) -> NaiveDate { self.day(1) }

  pub fn last_day(self) -> NaiveDate { self.day(self.days_in_month()) }
}

fn is_leap_year(year: i32) -> bool {
  (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl From<NaiveDate> for YearMonth {
  fn from(date: NaiveDate) -> Self { Self::from_date(date) }
}

impl fmt::Display for YearMonth {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}-{:02}", self.year, self.month)
  }
}

impl FromStr for YearMonth {
  type Err = ParseMonthError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let err = || ParseMonthError(s.to_string());
    let (y, m) = s.trim().split_once('-').ok_or_else(err)?;
    let year: i32 = y.parse().map_err(|_| err())?;
    let month: u32 = m.parse().map_err(|_| err())?;
    Self::new(year, month).ok_or_else(err)
  }
}

impl TryFrom<String> for YearMonth {
  type Error = ParseMonthError;

  fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<YearMonth> for String {
  fn from(value: YearMonth) -> Self { value.to_string() }
}

// ─── MonthRange ──────────────────────────────────────────────────────────────

/// An inclusive range of months; `until: None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
  pub from:  YearMonth,
  pub until: Option<YearMonth>,
}

impl MonthRange {
  pub fn new(from: YearMonth, until: Option<YearMonth>) -> Self {
    Self { from, until }
  }

  pub fn from_dates(from: NaiveDate, until: Option<NaiveDate>) -> Self {
    Self::new(from.into(), until.map(YearMonth::from))
  }

  pub fn is_open_ended(&self) -> bool { self.until.is_none() }

  pub fn contains(&self, month: YearMonth) -> bool {
    month >= self.from && self.until.is_none_or(|until| month <= until)
  }

  pub fn overlaps(&self, other: &MonthRange) -> bool {
    let self_before_other_ends = other.until.is_none_or(|u| self.from <= u);
    let other_before_self_ends = self.until.is_none_or(|u| other.from <= u);
    self_before_other_ends && other_before_self_ends
  }

  /// Inclusive month count, `None` when open-ended.
  pub fn len_months(&self) -> Option<u32> {
    self.until.map(|until| self.from.months_until(until))
  }
}

impl fmt::Display for MonthRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.until {
      Some(until) => write!(f, "{} to {}", self.from, until),
      None => write!(f, "{} onwards", self.from),
    }
  }
}
