//! `leaderboard` pipeline binary.
//!
//! Reads `leaderboard.toml` (or the path given with `--config`) plus any
//! `LEADERBOARD_*` environment variables, opens the SQLite store, and runs
//! one stage.
//!
//! ```text
//! leaderboard prepare
//! LEADERBOARD_SCRAPE_DAYS=7 leaderboard scrape
//! leaderboard prebuild
//! leaderboard export
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use leaderboard_cli::{FeedSource, PipelineConfig, stages};
use leaderboard_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Leaderboard data pipeline")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "leaderboard.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
  /// Fetch recent activity from the configured feed.
  Scrape,
  /// Register activity, badge and aggregate definitions.
  Prepare,
  /// Compute aggregates and award badges.
  Prebuild,
  /// Write per-contributor activity and badge files.
  Export,
  /// Read per-contributor activity and badge files back into the store.
  Import,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = PipelineConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store = SqliteStore::open(&cfg.db_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.db_path))?;

  tracing::info!(stage = ?cli.command, db = %cfg.db_path.display(), "starting");

  match cli.command {
    Command::Prepare => {
      stages::prepare(&store).await.context("prepare failed")?;
    }
    Command::Scrape => {
      let Some(feed) = &cfg.feed_path else {
        tracing::info!("no activity source configured, nothing to scrape");
        return Ok(());
      };
      stages::scrape(&store, &FeedSource::new(feed), Utc::now(), cfg.scrape_days)
        .await
        .context("scrape failed")?;
    }
    Command::Prebuild => {
      stages::prebuild(&store, Utc::now())
        .await
        .context("prebuild failed")?;
    }
    Command::Export => {
      let layout = cfg.layout()?;
      stages::export(&store, &layout).await.context("export failed")?;
    }
    Command::Import => {
      let layout = cfg.layout()?;
      stages::import(&store, &layout).await.context("import failed")?;
    }
  }

  Ok(())
}
