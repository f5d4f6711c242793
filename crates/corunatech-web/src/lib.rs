//! Browser binding for the calendar
//! navigation state machine.
//!
//! The page renders every month and week
//! up front; this module only toggles which
//! one is visible and keeps the label and
//! the previous/next buttons in sync.

use std::cell::RefCell;
use std::rc::Rc;

use corunatech_core::navigation::{
  Breakpoint,
  CalendarNavigator,
  NavigationBootstrap,
  NavigationEvent,
  NavigationRender,
  NavigationSurface
};
use corunatech_core::tooltip::EventTooltipData;
use tracing::{
  debug,
  info,
  warn
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
  Element,
  Event,
  EventTarget,
  HtmlButtonElement,
  HtmlElement,
  MediaQueryListEvent
};

const ROOT_SELECTOR: &str =
  "[data-calendar-root]";
const MONTH_SELECTOR: &str =
  "[data-calendar-month]";
const WEEK_SELECTOR: &str =
  "[data-calendar-week]";
const LABEL_SELECTOR: &str =
  "[data-calendar-label]";
const PREV_SELECTOR: &str =
  "[data-action=\"prev\"]";
const NEXT_SELECTOR: &str =
  "[data-action=\"next\"]";

const MONTH_ACTIVE_CLASS: &str =
  "calendar-month--active";
const WEEK_ACTIVE_CLASS: &str =
  "calendar-week--active";

#[wasm_bindgen(start)]
pub fn start() {
  console_error_panic_hook::set_once();
  wasm_tracing::set_as_global_default();

  tracing::info!(
    "starting CoruñaTech calendar \
     frontend"
  );
}

/// DOM elements the navigator writes to.
pub struct DomSurface {
  root:   HtmlElement,
  months: Vec<HtmlElement>,
  weeks:  Vec<HtmlElement>,
  label:  Option<HtmlElement>,
  prev:   Option<HtmlButtonElement>,
  next:   Option<HtmlButtonElement>
}

impl DomSurface {
  fn collect(
    root: HtmlElement
  ) -> Result<Self, JsValue> {
    let months =
      select_all(&root, MONTH_SELECTOR)?;
    let weeks =
      select_all(&root, WEEK_SELECTOR)?;
    let label =
      select_one(&root, LABEL_SELECTOR)?
        .and_then(|el| {
          el.dyn_into::<HtmlElement>().ok()
        });
    let prev = select_button(
      &root,
      PREV_SELECTOR
    )?;
    let next = select_button(
      &root,
      NEXT_SELECTOR
    )?;

    Ok(Self {
      root,
      months,
      weeks,
      label,
      prev,
      next
    })
  }

  fn month_labels(&self) -> Vec<String> {
    dataset_values(
      &self.months,
      "navLabel"
    )
  }

  fn week_labels(&self) -> Vec<String> {
    dataset_values(
      &self.weeks,
      "weekNavLabel"
    )
  }

  fn bootstrap(
    &self
  ) -> NavigationBootstrap {
    let dataset = self.root.dataset();
    NavigationBootstrap::from_attributes(
      |name| dataset.get(name)
    )
  }

  fn breakpoint(&self) -> Breakpoint {
    self
      .root
      .dataset()
      .get("mobileBreakpoint")
      .and_then(|raw| {
        raw.trim().parse().ok()
      })
      .map(|max_width_px| Breakpoint {
        max_width_px
      })
      .unwrap_or_default()
  }
}

impl NavigationSurface for DomSurface {
  fn apply(
    &mut self,
    render: &NavigationRender
  ) {
    report(
      self
        .root
        .dataset()
        .set("view", render.view.as_key()),
      "set data-view"
    );

    for (index, month) in
      self.months.iter().enumerate()
    {
      show(
        month,
        MONTH_ACTIVE_CLASS,
        render.is_month_visible(index)
      );
    }
    for (index, week) in
      self.weeks.iter().enumerate()
    {
      show(
        week,
        WEEK_ACTIVE_CLASS,
        render.is_week_visible(index)
      );
    }

    if let Some(label) = &self.label {
      label.set_text_content(Some(
        &render.label
      ));
    }
    if let Some(prev) = &self.prev {
      prev.set_disabled(
        render.prev_disabled
      );
    }
    if let Some(next) = &self.next {
      next.set_disabled(
        render.next_disabled
      );
    }
  }
}

struct Listener {
  target:   EventTarget,
  kind:     &'static str,
  callback: Closure<dyn FnMut(Event)>
}

/// Returned to the page so it can tear the
/// navigation down again.
#[wasm_bindgen]
pub struct CalendarNavigationHandle {
  navigator: Option<
    Rc<
      RefCell<
        CalendarNavigator<DomSurface>
      >
    >
  >,
  listeners: Vec<Listener>
}

#[wasm_bindgen]
impl CalendarNavigationHandle {
  /// Removes every listener installed by
  /// `initializeCalendarNavigation`.
  /// Calling it twice is a no-op.
  pub fn dispose(&mut self) {
    for listener in self.listeners.drain(..)
    {
      report(
        listener
          .target
          .remove_event_listener_with_callback(
            listener.kind,
            listener
              .callback
              .as_ref()
              .unchecked_ref()
          ),
        "remove listener"
      );
    }
    if self.navigator.take().is_some() {
      debug!("calendar navigation disposed");
    }
  }

  /// Active mode, `"month"` or `"week"`.
  #[wasm_bindgen(getter)]
  pub fn view(&self) -> Option<String> {
    let navigator =
      self.navigator.as_ref()?;
    let view = navigator
      .try_borrow()
      .ok()?
      .state()
      .mode
      .as_key()
      .to_string();
    Some(view)
  }
}

impl Drop for CalendarNavigationHandle {
  fn drop(&mut self) {
    self.dispose();
  }
}

/// Wires the calendar found under
/// `[data-calendar-root]`. Without a root
/// the returned handle is inert.
#[wasm_bindgen(
  js_name = initializeCalendarNavigation
)]
pub fn initialize_calendar_navigation()
-> Result<CalendarNavigationHandle, JsValue>
{
  let mut handle =
    CalendarNavigationHandle {
      navigator: None,
      listeners: vec![]
    };

  let window = web_sys::window()
    .ok_or_else(|| {
      JsValue::from_str("no window")
    })?;
  let document =
    window.document().ok_or_else(|| {
      JsValue::from_str("no document")
    })?;
  let Some(root) = document
    .query_selector(ROOT_SELECTOR)?
    .and_then(|el| {
      el.dyn_into::<HtmlElement>().ok()
    })
  else {
    debug!("no calendar root on page");
    return Ok(handle);
  };

  let surface = DomSurface::collect(root)?;
  let matcher = window
    .match_media(
      &surface.breakpoint().media_query()
    )?
    .ok_or_else(|| {
      JsValue::from_str(
        "matchMedia unavailable"
      )
    })?;

  info!(
    months = surface.months.len(),
    weeks = surface.weeks.len(),
    mobile = matcher.matches(),
    "initialising calendar navigation"
  );

  let bootstrap = surface.bootstrap();
  let month_labels = surface.month_labels();
  let week_labels = surface.week_labels();
  let prev = surface.prev.clone();
  let next = surface.next.clone();
  let navigator =
    Rc::new(RefCell::new(
      CalendarNavigator::new(
        bootstrap,
        month_labels,
        week_labels,
        matcher.matches(),
        surface
      )
    ));

  if let Some(button) = prev {
    handle.listen(
      button.into(),
      "click",
      dispatcher(&navigator, |_| {
        NavigationEvent::Previous
      })
    )?;
  }
  if let Some(button) = next {
    handle.listen(
      button.into(),
      "click",
      dispatcher(&navigator, |_| {
        NavigationEvent::Next
      })
    )?;
  }

  let fallback = matcher.clone();
  handle.listen(
    matcher.into(),
    "change",
    dispatcher(&navigator, move |event| {
      let mobile = event
        .dyn_ref::<MediaQueryListEvent>()
        .map_or_else(
          || fallback.matches(),
          MediaQueryListEvent::matches
        );
      NavigationEvent::ViewportChanged {
        mobile
      }
    })
  )?;

  handle.navigator = Some(navigator);
  Ok(handle)
}

impl CalendarNavigationHandle {
  fn listen(
    &mut self,
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>
  ) -> Result<(), JsValue> {
    target
      .add_event_listener_with_callback(
        kind,
        callback.as_ref().unchecked_ref()
      )?;
    self.listeners.push(Listener {
      target,
      kind,
      callback
    });
    Ok(())
  }
}

fn dispatcher<F>(
  navigator: &Rc<
    RefCell<CalendarNavigator<DomSurface>>
  >,
  to_event: F
) -> Closure<dyn FnMut(Event)>
where
  F: Fn(&Event) -> NavigationEvent
    + 'static
{
  let navigator = Rc::clone(navigator);
  Closure::new(move |event: Event| {
    let nav_event = to_event(&event);
    match navigator.try_borrow_mut() {
      | Ok(mut navigator) => {
        let state =
          navigator.dispatch(nav_event);
        debug!(?nav_event, ?state, "navigation event");
      }
      | Err(_) => {
        warn!(
          ?nav_event,
          "navigator busy; event dropped"
        );
      }
    }
  })
}

/// Reads the tooltip payload stored on an
/// event button's `data-event-*`
/// attributes.
#[wasm_bindgen(js_name = readEventTooltip)]
pub fn read_event_tooltip(
  element: &HtmlElement
) -> Result<JsValue, JsValue> {
  let dataset = element.dataset();
  let data =
    EventTooltipData::from_attributes(
      |name| dataset.get(name)
    );
  serde_wasm_bindgen::to_value(&data)
    .map_err(JsValue::from)
}

fn select_one(
  root: &Element,
  selector: &str
) -> Result<Option<Element>, JsValue> {
  root.query_selector(selector)
}

fn select_all(
  root: &Element,
  selector: &str
) -> Result<Vec<HtmlElement>, JsValue> {
  let nodes =
    root.query_selector_all(selector)?;
  Ok(
    (0..nodes.length())
      .filter_map(|index| nodes.get(index))
      .filter_map(|node| {
        node.dyn_into::<HtmlElement>().ok()
      })
      .collect()
  )
}

fn select_button(
  root: &Element,
  selector: &str
) -> Result<Option<HtmlButtonElement>, JsValue>
{
  Ok(select_one(root, selector)?.and_then(
    |el| {
      el.dyn_into::<HtmlButtonElement>()
        .ok()
    }
  ))
}

fn dataset_values(
  elements: &[HtmlElement],
  name: &str
) -> Vec<String> {
  elements
    .iter()
    .map(|el| {
      el.dataset()
        .get(name)
        .unwrap_or_default()
    })
    .collect()
}

fn show(
  element: &HtmlElement,
  active_class: &str,
  visible: bool
) {
  report(
    element
      .class_list()
      .toggle_with_force(
        active_class,
        visible
      )
      .map(|_| ()),
    "toggle active class"
  );
  let aria = if visible {
    element.remove_attribute("aria-hidden")
  } else {
    element
      .set_attribute("aria-hidden", "true")
  };
  report(aria, "update aria-hidden");
}

fn report(
  result: Result<(), JsValue>,
  what: &str
) {
  if let Err(err) = result {
    warn!(error = ?err, "failed to {what}");
  }
}
