//! Presentational labels for the
//! calendar.
//!
//! Display labels follow the Galician
//! (`gl`) conventions of the site; the
//! compact navigation labels use the
//! Spanish (`es-ES`) short month names and
//! are normalised by [`format_nav_label`].
//! Every function here is deterministic for
//! a given instant and timezone.

use chrono::{
  DateTime,
  Datelike,
  NaiveDate,
  TimeZone,
  Timelike,
  Weekday
};

const GL_MONTHS_LONG: [&str; 12] = [
  "xaneiro", "febreiro", "marzo",
  "abril", "maio", "xuño", "xullo",
  "agosto", "setembro", "outubro",
  "novembro", "decembro"
];

const GL_MONTHS_SHORT: [&str; 12] = [
  "xan.", "feb.", "mar.", "abr.",
  "maio", "xuño", "xul.", "ago.",
  "set.", "out.", "nov.", "dec."
];

const ES_MONTHS_SHORT: [&str; 12] = [
  "ene", "feb", "mar", "abr", "may",
  "jun", "jul", "ago", "sept", "oct",
  "nov", "dic"
];

// Monday first.
const GL_WEEKDAYS_LONG: [&str; 7] = [
  "luns", "martes", "mércores",
  "xoves", "venres", "sábado",
  "domingo"
];

const GL_WEEKDAYS_SHORT: [&str; 7] = [
  "luns", "mar.", "mér.", "xov.",
  "ven.", "sáb.", "dom."
];

const RANGE_SEPARATOR: &str = " – ";

fn month_slot(month: u32) -> usize {
  (month.clamp(1, 12) - 1) as usize
}

fn weekday_slot(
  weekday: Weekday
) -> usize {
  weekday.num_days_from_monday()
    as usize
}

/// Wall-clock `HH:MM` in the instant's
/// own timezone.
#[must_use]
pub fn format_time<Tz: TimeZone>(
  instant: &DateTime<Tz>
) -> String {
  format!(
    "{:02}:{:02}",
    instant.hour(),
    instant.minute()
  )
}

/// `venres, 15 de marzo de 2024, 10:00`
#[must_use]
pub fn format_full_date_time<
  Tz: TimeZone
>(
  instant: &DateTime<Tz>
) -> String {
  format!(
    "{}, {} de {} de {}, {}",
    GL_WEEKDAYS_LONG
      [weekday_slot(instant.weekday())],
    instant.day(),
    GL_MONTHS_LONG
      [month_slot(instant.month())],
    instant.year(),
    format_time(instant)
  )
}

/// `venres, 15 de marzo`, used by the
/// weekly digest.
#[must_use]
pub fn format_long_day<
  Tz: TimeZone
>(
  instant: &DateTime<Tz>
) -> String {
  format!(
    "{}, {} de {}",
    GL_WEEKDAYS_LONG
      [weekday_slot(instant.weekday())],
    instant.day(),
    GL_MONTHS_LONG
      [month_slot(instant.month())]
  )
}

/// `marzo de 2024`
#[must_use]
pub fn month_label(
  first_day: NaiveDate
) -> String {
  format!(
    "{} de {}",
    GL_MONTHS_LONG
      [month_slot(first_day.month())],
    first_day.year()
  )
}

/// `Mar 24`
#[must_use]
pub fn month_nav_label(
  first_day: NaiveDate
) -> String {
  format_nav_label(&format!(
    "{} {}",
    ES_MONTHS_SHORT
      [month_slot(first_day.month())],
    short_year(first_day.year())
  ))
}

/// `11 de mar. – 17 de mar.`
#[must_use]
pub fn week_range_label(
  start: NaiveDate,
  end: NaiveDate
) -> String {
  format!(
    "{}{RANGE_SEPARATOR}{}",
    gl_short_day(start),
    gl_short_day(end)
  )
}

/// `11 Mar – 17 Mar '24`; the year
/// suffix comes from `end`.
#[must_use]
pub fn build_week_nav_label(
  start: NaiveDate,
  end: NaiveDate
) -> String {
  format!(
    "{}{RANGE_SEPARATOR}{} '{}",
    format_nav_label(&es_short_day(
      start
    )),
    format_nav_label(&es_short_day(
      end
    )),
    short_year(end.year())
  )
}

#[must_use]
pub fn short_year(year: i32) -> String {
  let digits = year.to_string();
  let skip =
    digits.chars().count().saturating_sub(2);
  digits.chars().skip(skip).collect()
}

fn gl_short_day(date: NaiveDate) -> String {
  format!(
    "{} de {}",
    date.day(),
    GL_MONTHS_SHORT
      [month_slot(date.month())]
  )
}

fn es_short_day(date: NaiveDate) -> String {
  format!(
    "{} {}",
    date.day(),
    ES_MONTHS_SHORT
      [month_slot(date.month())]
  )
}

fn capitalise_initial(
  segment: &str
) -> String {
  let mut chars = segment.chars();
  match chars.next() {
    | Some(first) if first.is_alphabetic() => {
      first
        .to_uppercase()
        .chain(chars)
        .collect()
    }
    | _ => segment.to_string()
  }
}

/// Strips abbreviation dots and
/// capitalises the first letter of every
/// whitespace separated segment.
#[must_use]
pub fn format_nav_label(
  raw: &str
) -> String {
  let cleaned = raw.replace('.', "");
  let cleaned = cleaned.trim();
  if cleaned.is_empty() {
    return String::new();
  }

  cleaned
    .split_whitespace()
    .map(capitalise_initial)
    .collect::<Vec<_>>()
    .join(" ")
}

/// Monday first short weekday headers
/// with the abbreviation dot removed.
#[must_use]
pub fn weekday_labels() -> Vec<String> {
  GL_WEEKDAYS_SHORT
    .iter()
    .map(|label| label.replacen('.', "", 1))
    .collect()
}
