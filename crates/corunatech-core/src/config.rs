use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  error,
  info,
  warn
};

use crate::digest::DEFAULT_DIGEST_DAYS;
use crate::navigation::{
  Breakpoint,
  DEFAULT_MOBILE_BREAKPOINT_PX
};

const CONFIG_FILE: &str =
  "corunatech.toml";
const CONFIG_ENV_VAR: &str =
  "CORUNATECH_CONFIG";
const TIMEZONE_ENV_VAR: &str =
  "CORUNATECH_TIMEZONE";
pub const DEFAULT_TIMEZONE: &str =
  "Europe/Madrid";
const DEFAULT_BASE_URL: &str =
  "/corunatech";
const DEFAULT_SITE_URL: &str =
  "https://jorgeteixe.github.io/corunatech";

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct SiteConfig {
  pub timezone:             String,
  pub mobile_breakpoint_px: u32,
  pub base_url:             String,
  pub site_url:             String,
  pub digest_days:          i64,
  pub events_file:          Option<PathBuf>,
  pub communities_file:     Option<PathBuf>,
  #[serde(skip)]
  pub loaded_files:         Vec<PathBuf>
}

impl Default for SiteConfig {
  fn default() -> Self {
    Self {
      timezone:             DEFAULT_TIMEZONE
        .to_string(),
      mobile_breakpoint_px:
        DEFAULT_MOBILE_BREAKPOINT_PX,
      base_url:             DEFAULT_BASE_URL
        .to_string(),
      site_url:             DEFAULT_SITE_URL
        .to_string(),
      digest_days:          DEFAULT_DIGEST_DAYS,
      events_file:          None,
      communities_file:     None,
      loaded_files:         vec![]
    }
  }
}

impl SiteConfig {
  /// Loads the config file (explicit
  /// path, `$CORUNATECH_CONFIG`, then
  /// `./corunatech.toml`) and applies the
  /// `$CORUNATECH_TIMEZONE` override.
  #[tracing::instrument(skip(
    override_path
  ))]
  pub fn load(
    override_path: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = match resolve_config_path(
      override_path
    )? {
      | Some(path) => {
        info!(config = %path.display(), "loading site config");
        Self::load_file(&path)?
      }
      | None => {
        warn!(
          "no corunatech.toml found; \
           using defaults"
        );
        Self::default()
      }
    };

    if let Ok(raw) =
      std::env::var(TIMEZONE_ENV_VAR)
    {
      cfg.apply_overrides([(
        "timezone".to_string(),
        raw
      )])?;
    }

    Ok(cfg)
  }

  #[tracing::instrument]
  pub fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let mut cfg = Self::from_toml_str(
      &text
    )
    .with_context(|| {
      format!(
        "invalid config file {}",
        path.display()
      )
    })?;

    let base_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });
    cfg.events_file = cfg
      .events_file
      .map(|file| {
        resolve_relative(&base_dir, &file)
      });
    cfg.communities_file = cfg
      .communities_file
      .map(|file| {
        resolve_relative(&base_dir, &file)
      });
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let cfg: Self = toml::from_str(text)
      .context(
        "failed to parse site config"
      )?;
    debug!(?cfg, "parsed site config");
    Ok(cfg)
  }

  /// Applies `key=value` overrides from the
  /// command line or environment.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      let value = value.trim().to_string();
      debug!(key = %key, value = %value, "applying override");
      match key.trim() {
        | "timezone" => {
          self.timezone = value
        }
        | "mobile_breakpoint_px" => {
          self.mobile_breakpoint_px =
            value.parse().with_context(
              || {
                format!(
                  "invalid \
                   mobile_breakpoint_px: \
                   {value}"
                )
              }
            )?;
        }
        | "base_url" => {
          self.base_url = value
        }
        | "site_url" => {
          self.site_url = value
        }
        | "digest_days" => {
          self.digest_days =
            value.parse().with_context(
              || {
                format!(
                  "invalid digest_days: \
                   {value}"
                )
              }
            )?;
        }
        | "events_file" => {
          self.events_file =
            Some(expand_tilde(
              Path::new(&value)
            ))
        }
        | "communities_file" => {
          self.communities_file =
            Some(expand_tilde(
              Path::new(&value)
            ))
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: {other}"
          ));
        }
      }
    }
    Ok(())
  }

  /// Display timezone. An unknown id is
  /// logged and replaced by
  /// `Europe/Madrid`.
  #[must_use]
  pub fn timezone(&self) -> Tz {
    parse_timezone(&self.timezone)
      .or_else(|| {
        parse_timezone(DEFAULT_TIMEZONE)
      })
      .unwrap_or(chrono_tz::UTC)
  }

  #[must_use]
  pub fn breakpoint(&self) -> Breakpoint {
    Breakpoint {
      max_width_px: self
        .mobile_breakpoint_px
    }
  }
}

fn parse_timezone(
  raw: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    warn!("timezone was empty");
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => Some(tz),
    | Err(err) => {
      error!(
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Ok(Some(PathBuf::from(
        trimmed
      )));
    }
  }

  let cwd = std::env::current_dir()
    .context(
      "cannot determine current \
       directory"
    )?;
  let candidate = cwd.join(CONFIG_FILE);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_relative(
  base_dir: &Path,
  file: &Path
) -> PathBuf {
  let expanded = expand_tilde(file);
  if expanded.is_absolute() {
    expanded
  } else {
    base_dir.join(expanded)
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_target_madrid() {
    let cfg = SiteConfig::default();
    assert_eq!(
      cfg.timezone(),
      chrono_tz::Europe::Madrid
    );
    assert_eq!(
      cfg.breakpoint().max_width_px,
      768
    );
    assert_eq!(cfg.digest_days, 7);
  }

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg = SiteConfig::from_toml_str(
      "timezone = \"Atlantic/Canary\"\n\
       mobile_breakpoint_px = 600\n"
    )
    .expect("valid config");
    assert_eq!(
      cfg.timezone(),
      chrono_tz::Atlantic::Canary
    );
    assert_eq!(
      cfg.mobile_breakpoint_px,
      600
    );
    assert_eq!(cfg.base_url, "/corunatech");
  }

  #[test]
  fn invalid_timezone_falls_back() {
    let mut cfg = SiteConfig::default();
    cfg
      .apply_overrides([(
        "timezone".to_string(),
        "Mars/Olympus".to_string()
      )])
      .expect("override accepted");
    assert_eq!(
      cfg.timezone(),
      chrono_tz::Europe::Madrid
    );
  }

  #[test]
  fn overrides_are_typed() {
    let mut cfg = SiteConfig::default();
    cfg
      .apply_overrides([(
        "digest_days".to_string(),
        " 14 ".to_string()
      )])
      .expect("numeric override");
    assert_eq!(cfg.digest_days, 14);

    assert!(
      cfg
        .apply_overrides([(
          "digest_days".to_string(),
          "fortnight".to_string()
        )])
        .is_err()
    );
    assert!(
      cfg
        .apply_overrides([(
          "colour".to_string(),
          "on".to_string()
        )])
        .is_err()
    );
  }
}
