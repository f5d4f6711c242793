//! Month/week navigation state machine.
//!
//! The state is a view mode derived from
//! the viewport plus one independent
//! cursor per mode. Transitions are pure;
//! turning the state into visible changes
//! goes through [`NavigationSurface`], so
//! the DOM binding only has to apply a
//! [`NavigationRender`].

use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  trace,
  warn
};

use crate::calendar::CalendarData;

pub const DEFAULT_MOBILE_BREAKPOINT_PX:
  u32 = 768;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  Month,
  Week
}

impl ViewMode {
  #[must_use]
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Month => "month",
      | Self::Week => "week"
    }
  }

  #[must_use]
  pub fn from_mobile(
    mobile: bool
  ) -> Self {
    if mobile {
      Self::Week
    } else {
      Self::Month
    }
  }
}

/// Viewport threshold. Widths up to and
/// including `max_width_px` count as
/// mobile, matching a CSS
/// `(max-width: Npx)` query.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct Breakpoint {
  pub max_width_px: u32
}

impl Default for Breakpoint {
  fn default() -> Self {
    Self {
      max_width_px:
        DEFAULT_MOBILE_BREAKPOINT_PX
    }
  }
}

impl Breakpoint {
  #[must_use]
  pub fn is_mobile(
    self,
    width_px: u32
  ) -> bool {
    width_px <= self.max_width_px
  }

  #[must_use]
  pub fn mode_for_width(
    self,
    width_px: u32
  ) -> ViewMode {
    ViewMode::from_mobile(
      self.is_mobile(width_px)
    )
  }

  #[must_use]
  pub fn media_query(self) -> String {
    format!(
      "(max-width: {}px)",
      self.max_width_px
    )
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum NavigationEvent {
  Previous,
  Next,
  ViewportChanged { mobile: bool }
}

/// Starting cursors, usually read from the
/// calendar root's data attributes.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct NavigationBootstrap {
  pub initial_month_index: usize,
  pub initial_week_index:  usize
}

impl NavigationBootstrap {
  #[must_use]
  pub fn from_calendar(
    data: &CalendarData
  ) -> Self {
    Self {
      initial_month_index: data
        .initial_month_index,
      initial_week_index:  data
        .initial_week_index
    }
  }

  /// Decodes `initialMonthIndex` and
  /// `initialWeekIndex` from a dataset
  /// lookup. Missing or malformed values
  /// fall back to 0.
  #[must_use]
  pub fn from_attributes<F>(
    lookup: F
  ) -> Self
  where
    F: Fn(&str) -> Option<String>
  {
    Self {
      initial_month_index:
        decode_index(
          &lookup,
          "initialMonthIndex"
        ),
      initial_week_index:  decode_index(
        &lookup,
        "initialWeekIndex"
      )
    }
  }
}

fn decode_index<F>(
  lookup: &F,
  name: &str
) -> usize
where
  F: Fn(&str) -> Option<String>
{
  let Some(raw) = lookup(name) else {
    return 0;
  };
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return 0;
  }
  match trimmed.parse::<usize>() {
    | Ok(index) => index,
    | Err(error) => {
      warn!(
        attribute = name,
        value = %trimmed,
        %error,
        "invalid navigation index; using 0"
      );
      0
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct NavigationState {
  pub mode:        ViewMode,
  pub month_index: usize,
  pub week_index:  usize,
  pub month_count: usize,
  pub week_count:  usize
}

fn clamp_index(
  index: usize,
  count: usize
) -> usize {
  index.min(count.saturating_sub(1))
}

impl NavigationState {
  #[must_use]
  pub fn new(
    bootstrap: NavigationBootstrap,
    month_count: usize,
    week_count: usize,
    mobile: bool
  ) -> Self {
    Self {
      mode: ViewMode::from_mobile(mobile),
      month_index: clamp_index(
        bootstrap.initial_month_index,
        month_count
      ),
      week_index: clamp_index(
        bootstrap.initial_week_index,
        week_count
      ),
      month_count,
      week_count
    }
  }

  /// Cursor of the active mode.
  #[must_use]
  pub fn index(&self) -> usize {
    match self.mode {
      | ViewMode::Month => {
        self.month_index
      }
      | ViewMode::Week => self.week_index
    }
  }

  /// Number of pages in the active mode.
  #[must_use]
  pub fn count(&self) -> usize {
    match self.mode {
      | ViewMode::Month => {
        self.month_count
      }
      | ViewMode::Week => self.week_count
    }
  }

  #[must_use]
  pub fn transition(
    self,
    event: NavigationEvent
  ) -> Self {
    let mut next = self;
    match event {
      | NavigationEvent::Previous => {
        let cursor = next.cursor_mut();
        if *cursor > 0 {
          *cursor -= 1;
        }
      }
      | NavigationEvent::Next => {
        let last = next
          .count()
          .saturating_sub(1);
        let cursor = next.cursor_mut();
        if *cursor < last {
          *cursor += 1;
        }
      }
      | NavigationEvent::ViewportChanged {
        mobile
      } => {
        next.mode =
          ViewMode::from_mobile(mobile);
      }
    }
    trace!(?event, before = ?self, after = ?next, "navigation transition");
    next
  }

  fn cursor_mut(&mut self) -> &mut usize {
    match self.mode {
      | ViewMode::Month => {
        &mut self.month_index
      }
      | ViewMode::Week => {
        &mut self.week_index
      }
    }
  }

  /// Computes what the page should show.
  /// With nothing to show in the active
  /// mode the controls are disabled and
  /// the label is cleared.
  #[must_use]
  pub fn render(
    &self,
    month_labels: &[String],
    week_labels: &[String]
  ) -> NavigationRender {
    if self.count() == 0 {
      return NavigationRender {
        view:          self.mode,
        active:        None,
        label:         String::new(),
        prev_disabled: true,
        next_disabled: true
      };
    }

    let index = self.index();
    let labels = match self.mode {
      | ViewMode::Month => month_labels,
      | ViewMode::Week => week_labels
    };

    NavigationRender {
      view:          self.mode,
      active:        Some(index),
      label:         labels
        .get(index)
        .cloned()
        .unwrap_or_default(),
      prev_disabled: index == 0,
      next_disabled: index + 1
        >= self.count()
    }
  }
}

/// Visible outcome of a state: which
/// element of the active mode is shown
/// (every other month and week is hidden),
/// the label text and the button states.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRender {
  pub view:          ViewMode,
  pub active:        Option<usize>,
  pub label:         String,
  pub prev_disabled: bool,
  pub next_disabled: bool
}

impl NavigationRender {
  #[must_use]
  pub fn is_month_visible(
    &self,
    index: usize
  ) -> bool {
    self.view == ViewMode::Month
      && self.active == Some(index)
  }

  #[must_use]
  pub fn is_week_visible(
    &self,
    index: usize
  ) -> bool {
    self.view == ViewMode::Week
      && self.active == Some(index)
  }
}

/// Whatever displays the calendar.
pub trait NavigationSurface {
  fn apply(
    &mut self,
    render: &NavigationRender
  );
}

/// Caller owned navigation handle: owns
/// the state, the nav labels and the
/// surface, and re-renders after every
/// dispatched event.
#[derive(Debug)]
pub struct CalendarNavigator<S> {
  state:        NavigationState,
  month_labels: Vec<String>,
  week_labels:  Vec<String>,
  surface:      S
}

impl<S: NavigationSurface>
  CalendarNavigator<S>
{
  pub fn new(
    bootstrap: NavigationBootstrap,
    month_labels: Vec<String>,
    week_labels: Vec<String>,
    mobile: bool,
    surface: S
  ) -> Self {
    let state = NavigationState::new(
      bootstrap,
      month_labels.len(),
      week_labels.len(),
      mobile
    );
    let mut navigator = Self {
      state,
      month_labels,
      week_labels,
      surface
    };
    debug!(state = ?navigator.state, "navigation initialised");
    navigator.render();
    navigator
  }

  pub fn for_calendar(
    data: &CalendarData,
    mobile: bool,
    surface: S
  ) -> Self {
    Self::new(
      NavigationBootstrap::from_calendar(
        data
      ),
      data
        .months
        .iter()
        .map(|month| {
          month.nav_label.clone()
        })
        .collect(),
      data
        .all_weeks
        .iter()
        .map(|week| {
          week.nav_label.clone()
        })
        .collect(),
      mobile,
      surface
    )
  }

  pub fn dispatch(
    &mut self,
    event: NavigationEvent
  ) -> &NavigationState {
    self.state =
      self.state.transition(event);
    self.render();
    &self.state
  }

  #[must_use]
  pub fn state(
    &self
  ) -> &NavigationState {
    &self.state
  }

  #[must_use]
  pub fn surface(&self) -> &S {
    &self.surface
  }

  pub fn into_surface(self) -> S {
    self.surface
  }

  fn render(&mut self) {
    let render = self.state.render(
      &self.month_labels,
      &self.week_labels
    );
    self.surface.apply(&render);
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;

  #[derive(Debug, Default)]
  struct RecordingSurface {
    renders: Vec<NavigationRender>
  }

  impl NavigationSurface
    for RecordingSurface
  {
    fn apply(
      &mut self,
      render: &NavigationRender
    ) {
      self.renders.push(render.clone());
    }
  }

  impl RecordingSurface {
    fn last(&self) -> &NavigationRender {
      self
        .renders
        .last()
        .expect("at least one render")
    }
  }

  fn labels(
    prefix: &str,
    count: usize
  ) -> Vec<String> {
    (0..count)
      .map(|index| format!("{prefix}{index}"))
      .collect()
  }

  fn navigator(
    month_index: usize,
    week_index: usize,
    mobile: bool
  ) -> CalendarNavigator<RecordingSurface>
  {
    CalendarNavigator::new(
      NavigationBootstrap {
        initial_month_index: month_index,
        initial_week_index:  week_index
      },
      labels("M", 4),
      labels("W", 12),
      mobile,
      RecordingSurface::default()
    )
  }

  #[test]
  fn previous_at_first_month_is_a_no_op()
  {
    let mut nav = navigator(0, 3, false);
    assert!(nav.surface().last().prev_disabled);

    let state =
      *nav.dispatch(NavigationEvent::Previous);
    assert_eq!(state.month_index, 0);
    let render = nav.surface().last();
    assert!(render.prev_disabled);
    assert!(!render.next_disabled);
    assert_eq!(render.label, "M0");
  }

  #[test]
  fn next_stops_at_last_month() {
    let mut nav = navigator(2, 0, false);
    nav.dispatch(NavigationEvent::Next);
    nav.dispatch(NavigationEvent::Next);
    assert_eq!(nav.state().month_index, 3);
    let render = nav.surface().last();
    assert!(render.next_disabled);
    assert!(!render.prev_disabled);
    assert_eq!(render.active, Some(3));
    assert!(render.is_month_visible(3));
    assert!(!render.is_week_visible(0));
  }

  #[test]
  fn resize_keeps_independent_cursors() {
    let mut nav = navigator(2, 7, false);
    nav.dispatch(
      NavigationEvent::ViewportChanged {
        mobile: true
      }
    );
    let state = *nav.state();
    assert_eq!(state.mode, ViewMode::Week);
    assert_eq!(state.week_index, 7);
    assert_eq!(state.month_index, 2);
    assert_eq!(nav.surface().last().label, "W7");

    nav.dispatch(NavigationEvent::Previous);
    nav.dispatch(
      NavigationEvent::ViewportChanged {
        mobile: false
      }
    );
    let state = *nav.state();
    assert_eq!(state.week_index, 6);
    assert_eq!(state.month_index, 2);
    assert_eq!(nav.surface().last().label, "M2");
  }

  #[test]
  fn empty_mode_disables_navigation() {
    let mut nav = CalendarNavigator::new(
      NavigationBootstrap::default(),
      labels("M", 2),
      vec![],
      false,
      RecordingSurface::default()
    );
    nav.dispatch(
      NavigationEvent::ViewportChanged {
        mobile: true
      }
    );
    let render = nav.surface().last();
    assert_eq!(render.active, None);
    assert_eq!(render.label, "");
    assert!(render.prev_disabled);
    assert!(render.next_disabled);

    nav.dispatch(NavigationEvent::Next);
    assert_eq!(nav.state().week_index, 0);
  }

  #[test]
  fn single_page_disables_both_buttons() {
    let state = NavigationState::new(
      NavigationBootstrap::default(),
      1,
      1,
      false
    );
    let render =
      state.render(&labels("M", 1), &labels("W", 1));
    assert!(render.prev_disabled);
    assert!(render.next_disabled);
    assert_eq!(render.active, Some(0));
  }

  #[test]
  fn bootstrap_decodes_dataset_values() {
    let mut dataset = BTreeMap::new();
    dataset.insert(
      "initialMonthIndex".to_string(),
      " 3 ".to_string()
    );
    dataset.insert(
      "initialWeekIndex".to_string(),
      "soon".to_string()
    );
    let bootstrap =
      NavigationBootstrap::from_attributes(
        |name| dataset.get(name).cloned()
      );
    assert_eq!(
      bootstrap,
      NavigationBootstrap {
        initial_month_index: 3,
        initial_week_index:  0
      }
    );
  }

  #[test]
  fn out_of_range_bootstrap_is_clamped() {
    let state = NavigationState::new(
      NavigationBootstrap {
        initial_month_index: 40,
        initial_week_index:  40
      },
      3,
      10,
      true
    );
    assert_eq!(state.month_index, 2);
    assert_eq!(state.week_index, 9);
    assert_eq!(state.index(), 9);
  }

  #[test]
  fn breakpoint_matches_max_width_query() {
    let breakpoint = Breakpoint::default();
    assert!(breakpoint.is_mobile(768));
    assert!(!breakpoint.is_mobile(769));
    assert_eq!(
      breakpoint.mode_for_width(320),
      ViewMode::Week
    );
    assert_eq!(
      breakpoint.media_query(),
      "(max-width: 768px)"
    );
  }
}
