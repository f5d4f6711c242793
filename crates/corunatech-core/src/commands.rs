use std::io::Write;
use std::path::PathBuf;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Utc
};
use serde::Serialize;
use tracing::{
  debug,
  info
};

use crate::calendar::{
  CalendarData,
  create_calendar_data
};
use crate::cli::{
  CalendarArgs,
  Command,
  ContentArgs,
  DigestArgs
};
use crate::config::SiteConfig;
use crate::content::{
  CommunityNames,
  Event,
  community_href,
  community_names,
  load_communities,
  load_events
};
use crate::digest::{
  DigestWindow,
  daily_message,
  events_in_window,
  separate_events_by_date,
  weekly_message
};
use crate::range::{
  calculate_date_range,
  generate_month_keys,
  month_keys_for
};

/// Loaded inputs shared by every
/// subcommand, with `now` read at most
/// once.
struct Inputs {
  events:          Vec<Event>,
  community_names: CommunityNames,
  now:             DateTime<Utc>
}

fn pick_path(
  explicit: Option<&PathBuf>,
  configured: Option<&PathBuf>,
  what: &str
) -> anyhow::Result<PathBuf> {
  explicit
    .or(configured)
    .cloned()
    .ok_or_else(|| {
      anyhow!(
        "no {what} file given; pass \
         --{what} or set {what}_file in \
         the config"
      )
    })
}

fn load_inputs(
  cfg: &SiteConfig,
  args: &ContentArgs,
  need_communities: bool
) -> anyhow::Result<Inputs> {
  let events_path = pick_path(
    args.events.as_ref(),
    cfg.events_file.as_ref(),
    "events"
  )?;
  let events = load_events(&events_path)?;

  let communities_path = args
    .communities
    .as_ref()
    .or(cfg.communities_file.as_ref());
  let community_names =
    match communities_path {
      | Some(path) => community_names(
        &load_communities(path)?
      ),
      | None if need_communities => {
        return Err(anyhow!(
          "no communities file given; \
           pass --communities or set \
           communities_file in the \
           config"
        ));
      }
      | None => CommunityNames::new()
    };

  let now = args.now.unwrap_or_else(|| {
    let now = Utc::now();
    debug!(%now, "using current time as reference");
    now
  });

  Ok(Inputs {
    events,
    community_names,
    now
  })
}

/// `calendar` output: the projection plus
/// the viewport breakpoint the page writes
/// into `data-mobile-breakpoint`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarOutput<'a> {
  #[serde(flatten)]
  calendar:           &'a CalendarData,
  mobile_breakpoint:  u32,
  mobile_media_query: String
}

#[tracing::instrument(skip_all)]
pub fn dispatch<W: Write>(
  cfg: &SiteConfig,
  command: Command,
  out: &mut W
) -> anyhow::Result<()> {
  match command {
    | Command::Calendar(args) => {
      cmd_calendar(cfg, &args, out)
    }
    | Command::Months(args) => {
      cmd_months(cfg, &args, out)
    }
    | Command::Events(args) => {
      cmd_events(cfg, &args, out)
    }
    | Command::Digest(args) => {
      cmd_digest(cfg, &args, out)
    }
  }
}

fn cmd_calendar<W: Write>(
  cfg: &SiteConfig,
  args: &CalendarArgs,
  out: &mut W
) -> anyhow::Result<()> {
  let inputs =
    load_inputs(cfg, &args.content, true)?;
  let timezone = cfg.timezone();

  let month_keys =
    match (args.from, args.to) {
      | (None, None) => month_keys_for(
        &inputs.events,
        inputs.now,
        timezone
      ),
      | (from, to) => {
        let range = calculate_date_range(
          &inputs.events,
          inputs.now,
          timezone
        );
        generate_month_keys(
          from.unwrap_or(range.start),
          to.unwrap_or(range.end)
        )
      }
    };

  let data = create_calendar_data(
    &inputs.events,
    &inputs.community_names,
    inputs.now,
    &month_keys,
    timezone
  );

  let breakpoint = cfg.breakpoint();
  let output = CalendarOutput {
    calendar:           &data,
    mobile_breakpoint:  breakpoint
      .max_width_px,
    mobile_media_query: breakpoint
      .media_query()
  };

  let json = if args.pretty {
    serde_json::to_string_pretty(&output)
  } else {
    serde_json::to_string(&output)
  }
  .context(
    "failed to serialize calendar data"
  )?;
  writeln!(out, "{json}")
    .context("failed to write output")?;
  info!(
    months = data.months.len(),
    "calendar written"
  );
  Ok(())
}

fn cmd_months<W: Write>(
  cfg: &SiteConfig,
  args: &ContentArgs,
  out: &mut W
) -> anyhow::Result<()> {
  let inputs =
    load_inputs(cfg, args, false)?;
  for key in month_keys_for(
    &inputs.events,
    inputs.now,
    cfg.timezone()
  ) {
    writeln!(out, "{key}")
      .context("failed to write output")?;
  }
  Ok(())
}

fn write_event_line<W: Write>(
  out: &mut W,
  event: &Event,
  names: &CommunityNames,
  cfg: &SiteConfig
) -> anyhow::Result<()> {
  let local =
    event.date.with_timezone(&cfg.timezone());
  let community = names
    .get(&event.community)
    .unwrap_or(&event.community);
  writeln!(
    out,
    "  {}  {}  [{}]  {}",
    local.format("%Y-%m-%d %H:%M"),
    event.title,
    community,
    community_href(
      &event.community,
      &cfg.base_url
    )
  )
  .context("failed to write output")
}

fn cmd_events<W: Write>(
  cfg: &SiteConfig,
  args: &ContentArgs,
  out: &mut W
) -> anyhow::Result<()> {
  let inputs =
    load_inputs(cfg, args, false)?;
  let split = separate_events_by_date(
    &inputs.events,
    inputs.now
  );

  writeln!(
    out,
    "upcoming ({})",
    split.upcoming.len()
  )
  .context("failed to write output")?;
  for event in &split.upcoming {
    write_event_line(
      out,
      event,
      &inputs.community_names,
      cfg
    )?;
  }
  writeln!(
    out,
    "past ({})",
    split.past.len()
  )
  .context("failed to write output")?;
  for event in &split.past {
    write_event_line(
      out,
      event,
      &inputs.community_names,
      cfg
    )?;
  }
  Ok(())
}

fn cmd_digest<W: Write>(
  cfg: &SiteConfig,
  args: &DigestArgs,
  out: &mut W
) -> anyhow::Result<()> {
  let inputs =
    load_inputs(cfg, &args.content, false)?;
  let timezone = cfg.timezone();
  let days = if args.daily {
    1
  } else {
    args.days.unwrap_or(cfg.digest_days)
  };
  let window =
    DigestWindow::starting_today(
      inputs.now,
      days,
      timezone
    )
    .ok_or_else(|| {
      anyhow!(
        "digest window of {days} days \
         is out of range"
      )
    })?;
  let selected =
    events_in_window(&inputs.events, &window);

  let message = if args.daily {
    daily_message(
      &selected,
      &inputs.community_names,
      &cfg.site_url,
      timezone
    )
  } else {
    Some(weekly_message(
      &selected,
      &inputs.community_names,
      &cfg.site_url,
      timezone
    ))
  };
  match message {
    | Some(message) => {
      writeln!(out, "{message}")
        .context("failed to write output")?;
    }
    | None => {
      info!("no events today; nothing to announce");
    }
  }
  Ok(())
}
