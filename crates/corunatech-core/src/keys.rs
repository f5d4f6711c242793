//! Canonical calendar keys.
//!
//! Day keys are `YYYY-MM-DD`, month keys
//! are `YYYY-MM`. Both are zero padded so
//! lexical order equals chronological
//! order.

use chrono::{
  Datelike,
  NaiveDate
};

#[must_use]
pub fn build_day_key(
  year: i32,
  month: u32,
  day: u32
) -> String {
  format!("{year}-{month:02}-{day:02}")
}

#[must_use]
pub fn build_month_key(
  year: i32,
  month: u32
) -> String {
  format!("{year}-{month:02}")
}

#[must_use]
pub fn day_key(date: NaiveDate) -> String {
  build_day_key(
    date.year(),
    date.month(),
    date.day()
  )
}

#[must_use]
pub fn month_key(
  date: NaiveDate
) -> String {
  build_month_key(
    date.year(),
    date.month()
  )
}

/// Inverse of [`build_day_key`]. Returns
/// `None` for anything this module did
/// not produce.
#[must_use]
pub fn parse_day_key(
  key: &str
) -> Option<NaiveDate> {
  let mut parts = key.splitn(3, '-');
  let year =
    parts.next()?.parse::<i32>().ok()?;
  let month =
    parts.next()?.parse::<u32>().ok()?;
  let day =
    parts.next()?.parse::<u32>().ok()?;
  NaiveDate::from_ymd_opt(
    year, month, day
  )
}

/// Splits a month key into `(year,
/// month)` with a 1-based month.
#[must_use]
pub fn parse_month_key(
  key: &str
) -> Option<(i32, u32)> {
  let (year, month) =
    key.split_once('-')?;
  let year = year.parse::<i32>().ok()?;
  let month =
    month.parse::<u32>().ok()?;
  if !(1..=12).contains(&month) {
    return None;
  }
  Some((year, month))
}
