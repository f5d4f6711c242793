//! Upcoming/past event listings and the
//! weekly and daily announcement
//! messages.

use chrono::{
  DateTime,
  Duration,
  LocalResult,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use tracing::{
  debug,
  warn
};

use crate::content::{
  CommunityNames,
  Event
};
use crate::format::{
  format_long_day,
  format_time
};

pub const DEFAULT_DIGEST_DAYS: i64 = 7;

const DIGEST_HEADER: &str =
  "🗓️ *Eventos da próxima semana en CoruñaTech*";
const DIGEST_EMPTY: &str =
  "Non hai eventos programados para a próxima semana.";
const DIGEST_HASHTAGS: &str =
  "#CoruñaTech #EventosGalicia";

const DAILY_HEADER: &str =
  "🌅 *Eventos de hoxe en CoruñaTech*";
const DAILY_HASHTAGS: &str =
  "#CoruñaTech #EventosHoxe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedEvents<'a> {
  /// Strictly after `now`, soonest first.
  pub upcoming: Vec<&'a Event>,
  /// At or before `now`, latest first.
  pub past:     Vec<&'a Event>
}

#[must_use]
pub fn separate_events_by_date(
  events: &[Event],
  now: DateTime<Utc>
) -> SeparatedEvents<'_> {
  let (mut upcoming, mut past): (
    Vec<&Event>,
    Vec<&Event>
  ) = events
    .iter()
    .partition(|event| event.date > now);
  upcoming.sort_by_key(|event| event.date);
  past.sort_by(|a, b| b.date.cmp(&a.date));
  SeparatedEvents { upcoming, past }
}

/// Half open `[start, end)` window.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DigestWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>
}

impl DigestWindow {
  /// Starts at local midnight of `now` and
  /// spans `days` days (negative counts
  /// give an empty window). `None` when the
  /// end falls outside chrono's range.
  #[must_use]
  pub fn starting_today(
    now: DateTime<Utc>,
    days: i64,
    timezone: Tz
  ) -> Option<Self> {
    let local_date = now
      .with_timezone(&timezone)
      .date_naive();
    let start = local_date
      .and_hms_opt(0, 0, 0)
      .map(|midnight| {
        timezone
          .from_local_datetime(&midnight)
      })
      .and_then(|local| match local {
        | LocalResult::Single(dt) => {
          Some(dt)
        }
        | LocalResult::Ambiguous(
          first,
          _
        ) => Some(first),
        | LocalResult::None => None
      })
      .map(|dt| dt.with_timezone(&Utc))
      .unwrap_or_else(|| {
        warn!(
          date = %local_date,
          "local midnight missing; starting window at now"
        );
        now
      });
    let end = Duration::try_days(days.max(0))
      .and_then(|span| {
        start.checked_add_signed(span)
      });
    if end.is_none() {
      warn!(days, "digest window out of range");
    }
    end.map(|end| Self { start, end })
  }

  #[must_use]
  pub fn contains(
    &self,
    instant: DateTime<Utc>
  ) -> bool {
    instant >= self.start
      && instant < self.end
  }
}

#[must_use]
pub fn events_in_window<'a>(
  events: &'a [Event],
  window: &DigestWindow
) -> Vec<&'a Event> {
  let mut selected = events
    .iter()
    .filter(|event| {
      window.contains(event.date)
    })
    .collect::<Vec<_>>();
  selected.sort_by_key(|event| event.date);
  debug!(
    start = %window.start,
    end = %window.end,
    count = selected.len(),
    "selected events for digest"
  );
  selected
}

fn community_label<'a>(
  event: &'a Event,
  community_names: &'a CommunityNames
) -> &'a str {
  community_names
    .get(&event.community)
    .unwrap_or(&event.community)
}

fn push_line(
  message: &mut String,
  line: &str
) {
  message.push_str(line);
  message.push('\n');
}

fn push_footer(
  message: &mut String,
  site_url: &str,
  hashtags: &str
) {
  push_line(
    message,
    &format!("Máis información: {site_url}")
  );
  message.push_str(hashtags);
}

/// Renders the weekly announcement.
/// Communities are shown by display name
/// when known.
#[must_use]
pub fn weekly_message(
  events: &[&Event],
  community_names: &CommunityNames,
  site_url: &str,
  timezone: Tz
) -> String {
  let mut message =
    format!("{DIGEST_HEADER}\n\n");

  if events.is_empty() {
    message.push_str(DIGEST_EMPTY);
    message.push_str("\n\n");
  }

  for event in events {
    let local =
      event.date.with_timezone(&timezone);
    push_line(
      &mut message,
      &format!("📅 *{}*", event.title)
    );
    push_line(
      &mut message,
      &format!(
        "🏢 Comunidade: {}",
        community_label(event, community_names)
      )
    );
    push_line(
      &mut message,
      &format!(
        "📍 Data: {} ás {}",
        format_long_day(&local),
        format_time(&local)
      )
    );
    if let Some(location) =
      event.location.as_deref()
    {
      push_line(
        &mut message,
        &format!("🏠 Lugar: {location}")
      );
    }
    if let Some(link) =
      event.rsvp_link.as_deref()
    {
      push_line(
        &mut message,
        &format!("🔗 Inscribirse: {link}")
      );
    }
    message.push('\n');
  }

  push_footer(
    &mut message,
    site_url,
    DIGEST_HASHTAGS
  );
  message
}

/// Renders the same-day announcement.
/// A day without events produces no
/// message at all.
#[must_use]
pub fn daily_message(
  events: &[&Event],
  community_names: &CommunityNames,
  site_url: &str,
  timezone: Tz
) -> Option<String> {
  if events.is_empty() {
    debug!("no events today; skipping daily message");
    return None;
  }

  let mut message =
    format!("{DAILY_HEADER}\n\n");
  for event in events {
    let local =
      event.date.with_timezone(&timezone);
    push_line(
      &mut message,
      &format!("📅 *{}*", event.title)
    );
    push_line(
      &mut message,
      &format!(
        "🏢 Comunidade: {}",
        community_label(event, community_names)
      )
    );
    push_line(
      &mut message,
      &format!("⏰ Hora: {}", format_time(&local))
    );
    if let Some(location) =
      event.location.as_deref()
    {
      push_line(
        &mut message,
        &format!("🏠 Lugar: {location}")
      );
    }
    if let Some(duration) =
      event.duration.as_deref()
    {
      push_line(
        &mut message,
        &format!("⏱️ Duración: {duration}")
      );
    }
    if let Some(link) =
      event.rsvp_link.as_deref()
    {
      push_line(
        &mut message,
        &format!("🔗 Inscribirse: {link}")
      );
    }
    message.push('\n');
  }

  push_footer(
    &mut message,
    site_url,
    DAILY_HASHTAGS
  );
  Some(message)
}
