use chrono::{
  DateTime,
  Utc
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  info,
  warn
};

use crate::content::{
  CommunityNames,
  Event
};
use crate::grid::{
  DayCell,
  MonthData,
  MonthWeek,
  create_month_data,
  group_events_by_month
};
use crate::keys::{
  day_key,
  month_key,
  parse_month_key
};

/// A week tagged with the month it was
/// built from, so week navigation can
/// cross month boundaries.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct WeekEntry {
  pub key:         String,
  pub label:       String,
  pub nav_label:   String,
  pub days:        Vec<DayCell>,
  pub month_index: usize,
  pub month_key:   String
}

impl WeekEntry {
  fn from_week(
    week: &MonthWeek,
    month_index: usize,
    month_key: &str
  ) -> Self {
    Self {
      key: week.key.clone(),
      label: week.label.clone(),
      nav_label: week.nav_label.clone(),
      days: week.days.clone(),
      month_index,
      month_key: month_key.to_string()
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
pub struct CalendarData {
  pub months:              Vec<MonthData>,
  pub all_weeks:           Vec<WeekEntry>,
  pub initial_month_index: usize,
  pub initial_week_index:  usize,
  pub today_key:           String
}

/// Builds every requested month against a
/// single `now` snapshot. `month_keys` are
/// expected in chronological order; keys
/// that do not parse are skipped.
#[tracing::instrument(skip_all, fields(months = month_keys.len(), events = events.len()))]
#[must_use]
pub fn create_calendar_data(
  events: &[Event],
  community_names: &CommunityNames,
  now: DateTime<Utc>,
  month_keys: &[String],
  timezone: Tz
) -> CalendarData {
  let local_today = now
    .with_timezone(&timezone)
    .date_naive();
  let today_key = day_key(local_today);
  let current_month_key =
    month_key(local_today);

  let events_by_month =
    group_events_by_month(
      events, timezone
    );

  let months = month_keys
    .iter()
    .filter_map(|key| {
      let Some((year, month)) =
        parse_month_key(key)
      else {
        warn!(
          key = %key,
          "skipping malformed month key"
        );
        return None;
      };
      Some(create_month_data(
        year,
        month,
        &events_by_month,
        community_names,
        now,
        &today_key,
        timezone
      ))
    })
    .collect::<Vec<_>>();

  let all_weeks = months
    .iter()
    .enumerate()
    .flat_map(|(month_index, month)| {
      month.weeks.iter().map(
        move |week| {
          WeekEntry::from_week(
            week,
            month_index,
            &month.key
          )
        }
      )
    })
    .collect::<Vec<_>>();

  let initial_month_index = months
    .iter()
    .position(|month| {
      month.key == current_month_key
    })
    .unwrap_or(0);
  let initial_week_index = all_weeks
    .iter()
    .position(|week| {
      week
        .days
        .iter()
        .any(|day| day.key == today_key)
    })
    .unwrap_or(0);

  info!(
    months = months.len(),
    weeks = all_weeks.len(),
    initial_month_index,
    initial_week_index,
    today = %today_key,
    "built calendar data"
  );

  CalendarData {
    months,
    all_weeks,
    initial_month_index,
    initial_week_index,
    today_key
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use chrono_tz::Europe::Madrid;

  use super::*;

  fn event_at(
    id: &str,
    date: DateTime<Utc>
  ) -> Event {
    Event {
      id:          id.to_string(),
      title:       id.to_string(),
      description: String::new(),
      date,
      end_date:    None,
      duration:    None,
      location:    None,
      rsvp_link:   None,
      tags:        vec!["rust".into()],
      community:   "gdg".to_string()
    }
  }

  fn noon(
    year: i32,
    month: u32,
    day: u32
  ) -> DateTime<Utc> {
    Madrid
      .with_ymd_and_hms(
        year, month, day, 12, 0, 0
      )
      .single()
      .expect("valid local time")
      .with_timezone(&Utc)
  }

  fn keys(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|key| key.to_string()).collect()
  }

  #[test]
  fn initial_indices_point_at_today() {
    let data = create_calendar_data(
      &[event_at("a", noon(2024, 3, 15))],
      &CommunityNames::new(),
      noon(2024, 3, 20),
      &keys(&[
        "2024-02", "2024-03", "2024-04"
      ]),
      Madrid
    );

    assert_eq!(data.today_key, "2024-03-20");
    assert_eq!(data.initial_month_index, 1);
    let week = &data.all_weeks
      [data.initial_week_index];
    assert_eq!(week.month_key, "2024-03");
    assert!(
      week
        .days
        .iter()
        .any(|day| day.key == "2024-03-20")
    );
  }

  #[test]
  fn today_outside_range_defaults_to_zero(
  ) {
    let data = create_calendar_data(
      &[],
      &CommunityNames::new(),
      noon(2030, 1, 1),
      &keys(&["2024-03", "2024-04"]),
      Madrid
    );
    assert_eq!(data.initial_month_index, 0);
    assert_eq!(data.initial_week_index, 0);
    assert_eq!(data.months.len(), 2);
  }

  #[test]
  fn first_week_containing_today_wins() {
    // 2024-04-30 sits in the last row of
    // April and the first row of May.
    let data = create_calendar_data(
      &[],
      &CommunityNames::new(),
      noon(2024, 4, 30),
      &keys(&["2024-04", "2024-05"]),
      Madrid
    );
    let week = &data.all_weeks
      [data.initial_week_index];
    assert_eq!(week.month_index, 0);
    assert_eq!(
      week.key,
      "2024-04-29_2024-05-05"
    );
    assert_eq!(
      data.all_weeks
        [data.initial_week_index + 1]
        .key,
      "2024-04-29_2024-05-05"
    );
  }

  #[test]
  fn weeks_are_ordered_across_months() {
    let data = create_calendar_data(
      &[],
      &CommunityNames::new(),
      noon(2024, 1, 10),
      &keys(&[
        "2024-01", "2024-02", "2024-03"
      ]),
      Madrid
    );
    assert!(data.all_weeks.windows(2).all(
      |pair| {
        pair[0].days[0].key
          <= pair[1].days[0].key
          && pair[0].month_index
            <= pair[1].month_index
      }
    ));
    let total: usize = data
      .months
      .iter()
      .map(|month| month.weeks.len())
      .sum();
    assert_eq!(total, data.all_weeks.len());
  }

  #[test]
  fn identical_inputs_give_identical_output(
  ) {
    let events = vec![
      event_at("a", noon(2024, 3, 15)),
      event_at("b", noon(2024, 4, 2))
    ];
    let month_keys =
      keys(&["2024-03", "2024-04"]);
    let now = noon(2024, 3, 20);
    let first = create_calendar_data(
      &events,
      &CommunityNames::new(),
      now,
      &month_keys,
      Madrid
    );
    let second = create_calendar_data(
      &events,
      &CommunityNames::new(),
      now,
      &month_keys,
      Madrid
    );
    assert_eq!(first, second);
  }

  #[test]
  fn empty_month_list_is_well_formed() {
    let data = create_calendar_data(
      &[],
      &CommunityNames::new(),
      noon(2024, 3, 20),
      &[],
      Madrid
    );
    assert!(data.months.is_empty());
    assert!(data.all_weeks.is_empty());
    assert_eq!(data.initial_month_index, 0);
    assert_eq!(data.initial_week_index, 0);
  }
}
