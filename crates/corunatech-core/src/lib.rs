pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod content;
pub mod digest;
pub mod format;
pub mod grid;
pub mod keys;
pub mod navigation;
pub mod range;
pub mod tooltip;

use std::ffi::OsString;

use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting corunatech CLI"
  );

  let mut cfg = config::SiteConfig::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;
  debug!(?cfg, "effective site config");

  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  commands::dispatch(
    &cfg,
    cli.command,
    &mut out
  )?;

  info!("done");
  Ok(())
}
