use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::keys::parse_month_key;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "corunatech",
    version,
    about = "CoruñaTech community calendar builder"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Site config file (defaults to $CORUNATECH_CONFIG or ./corunatech.toml).
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Override a config key, e.g. --set timezone=Atlantic/Canary.
    #[arg(
        long = "set",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub overrides: Vec<KeyVal>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Emit the month/week calendar projection as JSON.
    Calendar(CalendarArgs),
    /// Print the month keys the calendar spans.
    Months(ContentArgs),
    /// List upcoming events, then past ones.
    Events(ContentArgs),
    /// Print the weekly announcement message.
    Digest(DigestArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ContentArgs {
    /// Events collection as a JSON array.
    #[arg(long = "events")]
    pub events: Option<PathBuf>,

    /// Communities collection as a JSON array.
    #[arg(long = "communities")]
    pub communities: Option<PathBuf>,

    /// Reference instant (RFC 3339); defaults to the current time.
    #[arg(long = "now", value_parser = parse_now)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Args, Debug, Clone)]
pub struct CalendarArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// First month to render (YYYY-MM).
    #[arg(long = "from", value_parser = parse_month_arg)]
    pub from: Option<NaiveDate>,

    /// Last month to render (YYYY-MM).
    #[arg(long = "to", value_parser = parse_month_arg)]
    pub to: Option<NaiveDate>,

    #[arg(long = "pretty")]
    pub pretty: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DigestArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// Window length in days (defaults to the config's digest_days).
    #[arg(long = "days", conflicts_with = "daily")]
    pub days: Option<i64>,

    /// Announce today's events only; prints nothing on an empty day.
    #[arg(long = "daily")]
    pub daily: bool,
}

fn parse_now(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 instant, got {raw}: {e}"))
}

fn parse_month_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_month_key(raw.trim())
        .and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
        .ok_or_else(|| format!("expected YYYY-MM, got: {raw}"))
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
