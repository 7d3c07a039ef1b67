//! JSON export and import for the leaderboard data tree.
//!
//! Each contributor gets one file per record kind:
//!
//! ```text
//! <root>/<source>/activities/<contributor>.json
//! <root>/<source>/badges/<contributor>.json
//! ```
//!
//! Every file holds a JSON array of [`record::ActivityRecord`]s or
//! [`record::BadgeRecord`]s. Exporting and then importing into a fresh store
//! reproduces the original activities and awards.

pub mod error;
pub mod export;
pub mod import;
pub mod layout;
pub mod record;

pub use error::{Error, Result};
pub use export::{ExportSummary, export_activities, export_badges};
pub use import::{ImportSummary, import_activities, import_badges};
pub use layout::{DataLayout, RecordKind};

#[cfg(test)]
mod tests;
