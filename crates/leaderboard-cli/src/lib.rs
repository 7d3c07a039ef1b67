//! The leaderboard pipeline: configuration, the scrape data source and the
//! stages the `leaderboard` binary runs.
//!
//! A typical run is `prepare`, `scrape`, `prebuild`, then `export`. On a
//! fresh machine, `prepare` followed by `import` restores a previous export.

pub mod config;
pub mod error;
pub mod source;
pub mod stages;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use source::{ActivitySource, FeedSource, ScrapeBatch};
