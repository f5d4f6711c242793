//! Month span covered by the calendar.

use chrono::{
  DateTime,
  Datelike,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use tracing::debug;

use crate::content::Event;
use crate::keys::month_key;

/// First days of the earliest and latest
/// reference months.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct MonthRange {
  pub start: NaiveDate,
  pub end:   NaiveDate
}

fn first_of_month(
  date: NaiveDate
) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

fn next_month(
  date: NaiveDate
) -> Option<NaiveDate> {
  if date.month() == 12 {
    NaiveDate::from_ymd_opt(
      date.year().checked_add(1)?,
      1,
      1
    )
  } else {
    NaiveDate::from_ymd_opt(
      date.year(),
      date.month() + 1,
      1
    )
  }
}

/// The reference set is every event date
/// plus `now`, so the current month is
/// always inside the range.
#[must_use]
pub fn calculate_date_range(
  events: &[Event],
  now: DateTime<Utc>,
  timezone: Tz
) -> MonthRange {
  let reference = events
    .iter()
    .map(|event| event.date)
    .chain(std::iter::once(now));
  let earliest = reference
    .clone()
    .min()
    .unwrap_or(now);
  let latest =
    reference.max().unwrap_or(now);

  MonthRange {
    start: first_of_month(
      earliest
        .with_timezone(&timezone)
        .date_naive()
    ),
    end:   first_of_month(
      latest
        .with_timezone(&timezone)
        .date_naive()
    )
  }
}

/// Every month key from `start` to `end`
/// inclusive, one calendar month at a
/// time. Empty when `start` is after
/// `end`.
#[must_use]
pub fn generate_month_keys(
  start: NaiveDate,
  end: NaiveDate
) -> Vec<String> {
  let mut keys = Vec::new();
  let end = first_of_month(end);
  let mut cursor =
    Some(first_of_month(start));

  while let Some(month) = cursor {
    if month > end {
      break;
    }
    keys.push(month_key(month));
    cursor = next_month(month);
  }

  keys
}

#[must_use]
pub fn month_keys_for(
  events: &[Event],
  now: DateTime<Utc>,
  timezone: Tz
) -> Vec<String> {
  let range = calculate_date_range(
    events, now, timezone
  );
  let keys = generate_month_keys(
    range.start,
    range.end
  );
  debug!(
    start = %range.start,
    end = %range.end,
    count = keys.len(),
    "generated month keys"
  );
  keys
}
