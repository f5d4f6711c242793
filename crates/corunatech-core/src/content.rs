use std::collections::{
  BTreeMap,
  HashSet
};
use std::fs;
use std::path::Path;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info
};

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Event {
  pub id:          String,
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub date:        DateTime<Utc>,
  #[serde(default)]
  pub end_date:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub duration:    Option<String>,
  #[serde(default)]
  pub location:    Option<String>,
  #[serde(default)]
  pub rsvp_link:   Option<String>,
  #[serde(default)]
  pub tags:        Vec<String>,
  pub community:   String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct SocialLink {
  pub name: String,
  pub url:  String
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
pub struct Community {
  pub slug:              String,
  pub name:              String,
  #[serde(default)]
  pub description:       String,
  #[serde(default)]
  pub website:           Option<String>,
  #[serde(default)]
  pub logo:              Option<String>,
  #[serde(default)]
  pub socials:           Vec<SocialLink>,
  #[serde(default)]
  pub tags:              Vec<String>,
  #[serde(default)]
  pub technologies:      Vec<String>,
  #[serde(default)]
  pub meeting_frequency: Option<String>,
  #[serde(default)]
  pub contact_email:     Option<String>
}

/// Slug to display name lookup used when
/// resolving event communities.
pub type CommunityNames =
  BTreeMap<String, String>;

#[must_use]
pub fn community_names(
  communities: &[Community]
) -> CommunityNames {
  communities
    .iter()
    .map(|community| {
      (
        community.slug.clone(),
        community.name.clone()
      )
    })
    .collect()
}

/// `<base>/communities/<slug>` with at
/// most one leading slash.
#[must_use]
pub fn community_href(
  community: &str,
  base_url: &str
) -> String {
  let base = base_url
    .strip_suffix('/')
    .unwrap_or(base_url);
  let joined =
    format!("{base}/communities/{community}");
  let trimmed =
    joined.trim_start_matches('/');
  if trimmed.len() == joined.len() {
    joined
  } else {
    format!("/{trimmed}")
  }
}

#[tracing::instrument(skip_all, fields(file = %path.display()))]
pub fn load_events(
  path: &Path
) -> anyhow::Result<Vec<Event>> {
  let raw = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read events file {}",
        path.display()
      )
    })?;
  let events = parse_events(&raw)
    .with_context(|| {
      format!(
        "invalid events file {}",
        path.display()
      )
    })?;
  info!(
    count = events.len(),
    "loaded events"
  );
  Ok(events)
}

/// Decodes and validates an events
/// collection. Dates must be RFC 3339
/// instants and every event needs a
/// community reference; anything else is
/// rejected here so it never reaches the
/// grid builder.
pub fn parse_events(
  raw: &str
) -> anyhow::Result<Vec<Event>> {
  let values: Vec<serde_json::Value> =
    serde_json::from_str(raw).context(
      "events collection must be a \
       JSON array"
    )?;

  let mut events =
    Vec::with_capacity(values.len());
  let mut seen = HashSet::new();
  for (index, value) in
    values.into_iter().enumerate()
  {
    let label = value
      .get("id")
      .and_then(|id| id.as_str())
      .map(str::to_string)
      .unwrap_or_else(|| {
        format!("#{index}")
      });
    let event: Event =
      serde_json::from_value(value)
        .with_context(|| {
          format!(
            "failed to decode event {label}"
          )
        })?;
    if event.community.trim().is_empty()
    {
      return Err(anyhow!(
        "event {} has an empty \
         community reference",
        event.id
      ));
    }
    if !seen.insert(event.id.clone()) {
      return Err(anyhow!(
        "duplicate event id {}",
        event.id
      ));
    }
    debug!(id = %event.id, date = %event.date, "decoded event");
    events.push(event);
  }

  Ok(events)
}

#[tracing::instrument(skip_all, fields(file = %path.display()))]
pub fn load_communities(
  path: &Path
) -> anyhow::Result<Vec<Community>> {
  let raw = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read communities \
         file {}",
        path.display()
      )
    })?;
  let communities: Vec<Community> =
    serde_json::from_str(&raw)
      .with_context(|| {
        format!(
          "invalid communities file {}",
          path.display()
        )
      })?;
  info!(
    count = communities.len(),
    "loaded communities"
  );
  Ok(communities)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_camel_case_events() {
    let events = parse_events(
      r#"[{
        "id": "rust-meetup",
        "title": "Rust meetup",
        "description": "Talks",
        "date": "2024-03-15T18:30:00Z",
        "rsvpLink": "https://example.org",
        "tags": ["rust"],
        "community": "rust-coruna"
      }]"#
    )
    .expect("valid events");

    assert_eq!(events.len(), 1);
    assert_eq!(
      events[0].rsvp_link.as_deref(),
      Some("https://example.org")
    );
    assert_eq!(events[0].location, None);
  }

  #[test]
  fn rejects_unparseable_dates() {
    let error = parse_events(
      r#"[{"id": "bad", "title": "x",
           "date": "tomorrow-ish",
           "community": "gdg"}]"#
    )
    .expect_err("date must fail");
    assert!(
      format!("{error:#}")
        .contains("failed to decode event bad")
    );
  }

  #[test]
  fn rejects_blank_community() {
    let error = parse_events(
      r#"[{"id": "orphan", "title": "x",
           "date": "2024-03-15T18:30:00Z",
           "community": "  "}]"#
    )
    .expect_err("blank community");
    assert!(
      error
        .to_string()
        .contains("empty community")
    );
  }

  #[test]
  fn community_href_normalises_slashes()
  {
    assert_eq!(
      community_href(
        "gdg",
        "/corunatech/"
      ),
      "/corunatech/communities/gdg"
    );
    assert_eq!(
      community_href("gdg", "/"),
      "/communities/gdg"
    );
    assert_eq!(
      community_href("gdg", "//x"),
      "/x/communities/gdg"
    );
  }

  #[test]
  fn community_names_map_slugs() {
    let names =
      community_names(&[Community {
        slug:              "gdg".into(),
        name:              "GDG Coruña"
          .into(),
        description:       String::new(),
        website:           None,
        logo:              None,
        socials:           vec![],
        tags:              vec![],
        technologies:      vec![],
        meeting_frequency: None,
        contact_email:     None
      }]);
    assert_eq!(
      names.get("gdg").map(String::as_str),
      Some("GDG Coruña")
    );
  }
}
