use serde::{
  Deserialize,
  Serialize
};
use tracing::warn;

use crate::grid::CalendarEventItem;

/// Tooltip payload carried on a rendered
/// event button as `data-event-*`
/// attributes.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct EventTooltipData {
  pub id:             String,
  pub title:          String,
  pub community_name: String,
  pub description:    String,
  pub date_label:     String,
  pub duration:       String,
  pub location:       String,
  pub tags:           Vec<String>,
  pub rsvp_link:      String,
  pub is_future:      bool
}

impl EventTooltipData {
  /// Decodes the dataset of an event
  /// button. `lookup` receives dataset
  /// names such as `eventTitle`.
  #[must_use]
  pub fn from_attributes<F>(
    lookup: F
  ) -> Self
  where
    F: Fn(&str) -> Option<String>
  {
    let text = |name: &str| {
      lookup(name).unwrap_or_default()
    };
    let tags = match lookup("eventTags")
    {
      | Some(raw)
        if !raw.trim().is_empty() =>
      {
        match serde_json::from_str::<
          Vec<String>,
        >(&raw)
        {
          | Ok(tags) => tags,
          | Err(error) => {
            warn!(
              %error,
              raw = %raw,
              "malformed event tags; using none"
            );
            vec![]
          }
        }
      }
      | _ => vec![]
    };

    Self {
      id: text("eventId"),
      title: text("eventTitle"),
      community_name: text(
        "eventCommunityName"
      ),
      description: text(
        "eventDescription"
      ),
      date_label: text("eventDateLabel"),
      duration: text("eventDuration"),
      location: text("eventLocation"),
      tags,
      rsvp_link: text("eventRsvpLink"),
      is_future: lookup("eventIsFuture")
        .as_deref()
        == Some("true")
    }
  }

  /// The attribute set the rendering
  /// layer writes for `item`; the inverse
  /// of [`Self::from_attributes`].
  #[must_use]
  pub fn attributes(
    item: &CalendarEventItem
  ) -> Vec<(&'static str, String)> {
    vec![
      ("eventId", item.id.clone()),
      ("eventTitle", item.title.clone()),
      (
        "eventCommunityName",
        item.community_name.clone()
      ),
      (
        "eventDescription",
        item.description.clone()
      ),
      (
        "eventDateLabel",
        item.date_label.clone()
      ),
      (
        "eventDuration",
        item
          .duration
          .clone()
          .unwrap_or_default()
      ),
      (
        "eventLocation",
        item
          .location
          .clone()
          .unwrap_or_default()
      ),
      (
        "eventTags",
        serde_json::to_string(&item.tags)
          .unwrap_or_else(|_| {
            "[]".to_string()
          })
      ),
      (
        "eventRsvpLink",
        item
          .rsvp_link
          .clone()
          .unwrap_or_default()
      ),
      (
        "eventIsFuture",
        item.is_future.to_string()
      ),
    ]
  }
}
