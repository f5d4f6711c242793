//! Month grid projection.
//!
//! A month is laid out Monday first and
//! padded on both ends with days borrowed
//! from the neighbouring months, so the
//! day list always tiles into full 7 day
//! weeks.

use std::collections::BTreeMap;

use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  warn
};

use crate::content::{
  CommunityNames,
  Event
};
use crate::format::{
  build_week_nav_label,
  format_full_date_time,
  format_time,
  month_label,
  month_nav_label,
  week_range_label
};
use crate::keys::{
  build_month_key,
  day_key,
  month_key,
  parse_day_key
};

/// Items shown per time slot before the
/// rest collapse into an overflow count.
pub const MAX_VISIBLE_ITEMS: usize = 5;

const DAYS_PER_WEEK: usize = 7;

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventItem {
  pub id:             String,
  pub title:          String,
  pub community:      String,
  pub community_name: String,
  pub description:    String,
  pub location:       Option<String>,
  pub duration:       Option<String>,
  pub tags:           Vec<String>,
  pub time_label:     String,
  pub date_label:     String,
  pub rsvp_link:      Option<String>,
  pub is_future:      bool
}

impl CalendarEventItem {
  #[must_use]
  pub fn from_event(
    event: &Event,
    community_names: &CommunityNames,
    now: DateTime<Utc>,
    timezone: Tz
  ) -> Self {
    let local =
      event.date.with_timezone(&timezone);
    let community_name =
      match community_names
        .get(&event.community)
      {
        | Some(name) => name.clone(),
        | None => {
          warn!(
            event = %event.id,
            community = %event.community,
            "unknown community; using raw reference"
          );
          event.community.clone()
        }
      };

    Self {
      id: event.id.clone(),
      title: event.title.clone(),
      community: event.community.clone(),
      community_name,
      description: event
        .description
        .clone(),
      location: event.location.clone(),
      duration: event.duration.clone(),
      tags: event.tags.clone(),
      time_label: format_time(&local),
      date_label: format_full_date_time(
        &local
      ),
      rsvp_link: event.rsvp_link.clone(),
      is_future: event.date > now
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct EventGroup {
  pub time_label: String,
  pub items:      Vec<CalendarEventItem>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct PreparedGroup {
  pub columns:        u8,
  pub visible_items:  Vec<CalendarEventItem>,
  pub overflow_items: Vec<CalendarEventItem>,
  pub overflow:       usize
}

#[must_use]
pub fn prepare_group(
  group: &EventGroup
) -> PreparedGroup {
  let split = group
    .items
    .len()
    .min(MAX_VISIBLE_ITEMS);
  let (visible, rest) =
    group.items.split_at(split);
  PreparedGroup {
    columns:        1,
    visible_items:  visible.to_vec(),
    overflow_items: rest.to_vec(),
    overflow:       rest.len()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
  pub key:              String,
  pub label:            u32,
  pub is_current_month: bool,
  pub is_today:         bool,
  pub groups:           Vec<EventGroup>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct MonthWeek {
  pub key:       String,
  pub label:     String,
  pub nav_label: String,
  pub days:      Vec<DayCell>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct MonthData {
  pub key:       String,
  pub label:     String,
  pub nav_label: String,
  pub days:      Vec<DayCell>,
  pub weeks:     Vec<MonthWeek>
}

/// Events bucketed by the month key of
/// their local date.
pub type EventsByMonth<'a> =
  BTreeMap<String, Vec<&'a Event>>;

#[must_use]
pub fn group_events_by_month(
  events: &[Event],
  timezone: Tz
) -> EventsByMonth<'_> {
  let mut by_month =
    EventsByMonth::new();
  for event in events {
    let local = event
      .date
      .with_timezone(&timezone)
      .date_naive();
    by_month
      .entry(month_key(local))
      .or_default()
      .push(event);
  }
  by_month
}

fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

fn days_in_month(
  first: NaiveDate
) -> u32 {
  let next_first =
    if first.month() == 12 {
      NaiveDate::from_ymd_opt(
        first.year().saturating_add(1),
        1,
        1
      )
    } else {
      NaiveDate::from_ymd_opt(
        first.year(),
        first.month() + 1,
        1
      )
    };
  next_first
    .map(|next| add_days(next, -1).day())
    .unwrap_or(31)
}

/// Groups a day's items by their
/// formatted time label, keeping the order
/// in which each label first appears.
fn group_by_time_label(
  items: Vec<CalendarEventItem>
) -> Vec<EventGroup> {
  let mut groups: Vec<EventGroup> =
    Vec::new();
  for item in items {
    match groups.iter_mut().find(
      |group| {
        group.time_label
          == item.time_label
      }
    ) {
      | Some(group) => {
        group.items.push(item)
      }
      | None => {
        groups.push(EventGroup {
          time_label: item
            .time_label
            .clone(),
          items:      vec![item]
        })
      }
    }
  }
  groups
}

/// Builds the padded grid for one month.
/// `month` is 1-based.
#[tracing::instrument(
  skip(
    events_by_month,
    community_names,
    now,
    today_key
  ),
  fields(key = %build_month_key(year, month))
)]
#[must_use]
pub fn create_month_data(
  year: i32,
  month: u32,
  events_by_month: &EventsByMonth<'_>,
  community_names: &CommunityNames,
  now: DateTime<Utc>,
  today_key: &str,
  timezone: Tz
) -> MonthData {
  let key = build_month_key(year, month);
  let Some(first_day) =
    NaiveDate::from_ymd_opt(
      year, month, 1
    )
  else {
    warn!(
      year,
      month,
      "month out of range; producing empty grid"
    );
    return MonthData {
      key,
      label: String::new(),
      nav_label: String::new(),
      days: vec![],
      weeks: vec![]
    };
  };
  let month_days =
    days_in_month(first_day);

  let mut month_events = events_by_month
    .get(&key)
    .cloned()
    .unwrap_or_default();
  month_events
    .sort_by_key(|event| event.date);

  let mut day_events: BTreeMap<
    String,
    Vec<CalendarEventItem>
  > = BTreeMap::new();
  for event in month_events {
    let local = event
      .date
      .with_timezone(&timezone)
      .date_naive();
    day_events
      .entry(day_key(local))
      .or_default()
      .push(CalendarEventItem::from_event(
        event,
        community_names,
        now,
        timezone
      ));
  }

  let start_offset = first_day
    .weekday()
    .num_days_from_monday()
    as usize;
  let total_cells = (start_offset
    + month_days as usize)
    .div_ceil(DAYS_PER_WEEK)
    * DAYS_PER_WEEK;

  let days = (0..total_cells)
    .map(|index| {
      let day_number = index as i64
        - start_offset as i64
        + 1;
      let date =
        add_days(first_day, day_number - 1);
      let key = day_key(date);
      let is_current_month = day_number
        >= 1
        && day_number
          <= i64::from(month_days);
      let items = if is_current_month {
        day_events
          .remove(&key)
          .unwrap_or_default()
      } else {
        vec![]
      };

      DayCell {
        is_today: key == today_key,
        key,
        label: date.day(),
        is_current_month,
        groups: group_by_time_label(items)
      }
    })
    .collect::<Vec<_>>();

  let weeks = days
    .chunks(DAYS_PER_WEEK)
    .filter_map(|week_days| {
      let first = week_days.first()?;
      let last = week_days.last()?;
      let start =
        parse_day_key(&first.key)?;
      let end =
        parse_day_key(&last.key)?;
      Some(MonthWeek {
        key:       format!(
          "{}_{}",
          first.key, last.key
        ),
        label:     week_range_label(
          start, end
        ),
        nav_label: build_week_nav_label(
          start, end
        ),
        days:      week_days.to_vec()
      })
    })
    .collect::<Vec<_>>();

  debug!(
    days = days.len(),
    weeks = weeks.len(),
    start_offset,
    "built month grid"
  );

  MonthData {
    key,
    label: month_label(first_day),
    nav_label: month_nav_label(
      first_day
    ),
    days,
    weeks
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use chrono_tz::Europe::Madrid;

  use super::*;

  fn event(
    id: &str,
    date: DateTime<Utc>,
    community: &str
  ) -> Event {
    Event {
      id:          id.to_string(),
      title:       format!("Event {id}"),
      description: String::new(),
      date,
      end_date:    None,
      duration:    None,
      location:    None,
      rsvp_link:   None,
      tags:        vec![],
      community:   community.to_string()
    }
  }

  fn madrid(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32
  ) -> DateTime<Utc> {
    Madrid
      .with_ymd_and_hms(
        year, month, day, hour, minute,
        second
      )
      .single()
      .expect("valid local time")
      .with_timezone(&Utc)
  }

  fn build(
    year: i32,
    month: u32,
    events: &[Event],
    now: DateTime<Utc>
  ) -> MonthData {
    let by_month =
      group_events_by_month(events, Madrid);
    let today_key = day_key(
      now.with_timezone(&Madrid)
        .date_naive()
    );
    create_month_data(
      year,
      month,
      &by_month,
      &CommunityNames::new(),
      now,
      &today_key,
      Madrid
    )
  }

  #[test]
  fn march_2024_grid_is_padded_to_full_weeks(
  ) {
    // 2024-03-01 is a Friday.
    let month = build(
      2024,
      3,
      &[],
      madrid(2024, 3, 10, 12, 0, 0)
    );

    assert_eq!(month.key, "2024-03");
    assert_eq!(month.days.len(), 35);
    assert_eq!(month.weeks.len(), 5);
    assert_eq!(
      month.days[0].key,
      "2024-02-26"
    );
    assert!(!month.days[0].is_current_month);
    assert_eq!(month.days[4].key, "2024-03-01");
    assert!(month.days[4].is_current_month);
    assert_eq!(
      month.days[34].key,
      "2024-03-31"
    );
    assert!(
      month
        .days
        .iter()
        .all(|day| day.groups.is_empty())
    );
    assert_eq!(
      month.weeks[0].key,
      "2024-02-26_2024-03-03"
    );
    assert_eq!(month.nav_label, "Mar 24");
    assert_eq!(month.label, "marzo de 2024");
  }

  #[test]
  fn weeks_tile_the_day_list() {
    for (year, month) in [
      (2024, 2),
      (2024, 9),
      (2025, 6),
      (2026, 2)
    ] {
      let data = build(
        year,
        month,
        &[],
        madrid(2024, 1, 1, 0, 0, 0)
      );
      assert_eq!(data.days.len() % 7, 0);
      assert_eq!(
        data.days.len(),
        data.weeks.len() * 7
      );
      let flattened = data
        .weeks
        .iter()
        .flat_map(|week| week.days.clone())
        .collect::<Vec<_>>();
      assert_eq!(flattened, data.days);
      assert!(data.days.windows(2).all(
        |pair| pair[0].key < pair[1].key
      ));
    }
  }

  #[test]
  fn february_2021_needs_no_padding() {
    // Starts on a Monday, 28 days.
    let data = build(
      2021,
      2,
      &[],
      madrid(2021, 2, 1, 0, 0, 0)
    );
    assert_eq!(data.days.len(), 28);
    assert!(
      data
        .days
        .iter()
        .all(|day| day.is_current_month)
    );
  }

  #[test]
  fn same_minute_events_share_a_group() {
    let events = vec![
      event(
        "a",
        madrid(2024, 3, 15, 10, 0, 0),
        "gdg"
      ),
      event(
        "b",
        madrid(2024, 3, 15, 10, 0, 30),
        "gdg"
      ),
      event(
        "c",
        madrid(2024, 3, 15, 18, 0, 0),
        "gdg"
      ),
    ];
    let data = build(
      2024,
      3,
      &events,
      madrid(2024, 3, 1, 0, 0, 0)
    );
    let day = data
      .days
      .iter()
      .find(|day| day.key == "2024-03-15")
      .expect("day present");

    assert_eq!(day.groups.len(), 2);
    assert_eq!(day.groups[0].time_label, "10:00");
    assert_eq!(
      day.groups[0]
        .items
        .iter()
        .map(|item| item.id.as_str())
        .collect::<Vec<_>>(),
      vec!["a", "b"]
    );
    assert_eq!(day.groups[1].time_label, "18:00");
  }

  #[test]
  fn is_future_compares_against_now() {
    let events = vec![
      event(
        "past",
        madrid(2024, 3, 5, 19, 0, 0),
        "gdg"
      ),
      event(
        "future",
        madrid(2024, 3, 20, 19, 0, 0),
        "gdg"
      ),
    ];
    let data = build(
      2024,
      3,
      &events,
      madrid(2024, 3, 10, 0, 0, 0)
    );
    let items = data
      .days
      .iter()
      .flat_map(|day| day.groups.iter())
      .flat_map(|group| group.items.iter())
      .map(|item| {
        (item.id.as_str(), item.is_future)
      })
      .collect::<Vec<_>>();

    assert_eq!(
      items,
      vec![("past", false), ("future", true)]
    );
    let today = data
      .days
      .iter()
      .filter(|day| day.is_today)
      .map(|day| day.key.as_str())
      .collect::<Vec<_>>();
    assert_eq!(today, vec!["2024-03-10"]);
  }

  #[test]
  fn unknown_community_falls_back_to_reference(
  ) {
    let mut names = CommunityNames::new();
    names.insert(
      "gdg".to_string(),
      "GDG Coruña".to_string()
    );
    let now = madrid(2024, 3, 1, 0, 0, 0);
    let known = CalendarEventItem::from_event(
      &event("a", now, "gdg"),
      &names,
      now,
      Madrid
    );
    let unknown =
      CalendarEventItem::from_event(
        &event("b", now, "python-vigo"),
        &names,
        now,
        Madrid
      );
    assert_eq!(known.community_name, "GDG Coruña");
    assert_eq!(
      unknown.community_name,
      "python-vigo"
    );
    assert!(!known.is_future);
  }

  #[test]
  fn events_bucket_by_local_date() {
    // 23:30 UTC on the last day of March
    // is already April in Madrid.
    let late = Utc
      .with_ymd_and_hms(
        2024, 3, 31, 23, 30, 0
      )
      .single()
      .expect("valid instant");
    let events =
      vec![event("late", late, "gdg")];
    let by_month =
      group_events_by_month(&events, Madrid);
    assert!(by_month.contains_key("2024-04"));
    assert!(!by_month.contains_key("2024-03"));
  }

  #[test]
  fn seven_items_overflow_by_two() {
    let now = madrid(2024, 3, 1, 0, 0, 0);
    let items = (0..7)
      .map(|index| {
        CalendarEventItem::from_event(
          &event(
            &format!("e{index}"),
            madrid(2024, 3, 15, 10, 0, 0),
            "gdg"
          ),
          &CommunityNames::new(),
          now,
          Madrid
        )
      })
      .collect::<Vec<_>>();
    let prepared =
      prepare_group(&EventGroup {
        time_label: "10:00".to_string(),
        items
      });

    assert_eq!(prepared.columns, 1);
    assert_eq!(
      prepared.visible_items.len(),
      5
    );
    assert_eq!(prepared.overflow, 2);
    assert_eq!(
      prepared.overflow_items[0].id,
      "e5"
    );
  }

  #[test]
  fn invalid_month_yields_empty_grid() {
    let data = build(
      2024,
      13,
      &[],
      madrid(2024, 3, 1, 0, 0, 0)
    );
    assert!(data.days.is_empty());
    assert!(data.weeks.is_empty());
  }
}
