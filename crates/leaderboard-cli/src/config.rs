//! Pipeline configuration.
//!
//! Read from an optional TOML file overlaid by `LEADERBOARD_*` environment
//! variables. Every check happens here, before a stage touches the store.

use std::path::{Path, PathBuf};

use leaderboard_export::DataLayout;
use serde::Deserialize;

use crate::{Error, Result};

pub const ENV_PREFIX: &str = "LEADERBOARD";

fn default_scrape_days() -> u32 { 1 }

fn default_source_name() -> String { "feed".to_owned() }

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
  /// SQLite file, or `:memory:`.
  pub db_path:     PathBuf,
  pub data_path:   PathBuf,
  #[serde(default = "default_scrape_days")]
  pub scrape_days: u32,
  #[serde(default = "default_source_name")]
  pub source_name: String,
  /// JSON feed read by `scrape`; without one, scraping is a no-op.
  #[serde(default)]
  pub feed_path:   Option<PathBuf>,
}

impl PipelineConfig {
  /// Load from `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
      .build()?;
    Self::from_settings(settings)
  }

  pub fn from_settings(settings: config::Config) -> Result<Self> {
    let mut cfg: Self = settings.try_deserialize()?;
    cfg.db_path = expand_tilde(&cfg.db_path);
    cfg.data_path = expand_tilde(&cfg.data_path);
    cfg.feed_path = cfg.feed_path.as_deref().map(expand_tilde);
    cfg.validate()?;
    Ok(cfg)
  }

  fn validate(&self) -> Result<()> {
    if self.db_path.as_os_str().is_empty() {
      return Err(Error::InvalidConfig("db_path must not be empty".into()));
    }
    if self.data_path.as_os_str().is_empty() {
      return Err(Error::InvalidConfig("data_path must not be empty".into()));
    }
    if self.scrape_days == 0 {
      return Err(Error::InvalidConfig("scrape_days must be at least 1".into()));
    }
    self.layout()?;
    Ok(())
  }

  /// The data tree exports are written to and imports read from.
  pub fn layout(&self) -> Result<DataLayout> {
    Ok(DataLayout::new(&self.data_path, &self.source_name)?)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{File, FileFormat};

  use super::*;

  fn from_toml(toml: &str) -> Result<PipelineConfig> {
    let settings = config::Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()?;
    PipelineConfig::from_settings(settings)
  }

  #[test]
  fn defaults_fill_optional_keys() {
    let cfg = from_toml(
      r#"
        db_path = "/var/lib/leaderboard.db"
        data_path = "/srv/data"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.scrape_days, 1);
    assert_eq!(cfg.source_name, "feed");
    assert_eq!(cfg.feed_path, None);
    assert_eq!(
      cfg.layout().unwrap().dir(leaderboard_export::RecordKind::Badges),
      Path::new("/srv/data/feed/badges")
    );
  }

  #[test]
  fn missing_required_keys_are_fatal() {
    let err = from_toml(r#"data_path = "/srv/data""#).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
  }

  #[test]
  fn invalid_values_are_rejected() {
    let zero_days = from_toml(
      r#"
        db_path = ":memory:"
        data_path = "/srv/data"
        scrape_days = 0
      "#,
    );
    assert!(matches!(zero_days, Err(Error::InvalidConfig(_))));

    let bad_source = from_toml(
      r#"
        db_path = ":memory:"
        data_path = "/srv/data"
        source_name = "../elsewhere"
      "#,
    );
    assert!(matches!(bad_source, Err(Error::Export(_))));

    let empty_db = from_toml(
      r#"
        db_path = ""
        data_path = "/srv/data"
      "#,
    );
    assert!(matches!(empty_db, Err(Error::InvalidConfig(_))));
  }

  #[test]
  fn loads_from_a_toml_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    std::fs::write(
      dir.path().join("present.toml"),
      "db_path = \":memory:\"\ndata_path = \"data\"\nscrape_days = 7\n",
    )
    .unwrap();

    let cfg = PipelineConfig::load(&dir.path().join("present.toml")).unwrap();
    assert_eq!(cfg.scrape_days, 7);
    assert_eq!(cfg.db_path, Path::new(":memory:"));

    // An absent file falls through to the environment alone.
    if std::env::var_os("LEADERBOARD_DB_PATH").is_none() {
      assert!(PipelineConfig::load(&path).is_err());
    }
  }
}
