//! Where exported files live.

use std::path::{Path, PathBuf};

use leaderboard_core::contributor::validate_username;
use strum::{AsRefStr, Display};

use crate::{Error, Result};

/// The record kinds partitioning the data tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
  Activities,
  Badges,
}

/// The `<root>/<source>` directory of one data source.
#[derive(Debug, Clone)]
pub struct DataLayout {
  root:   PathBuf,
  source: String,
}

impl DataLayout {
  /// `source` becomes a directory name, so it is held to the same rules as
  /// contributor usernames.
  pub fn new(root: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self> {
    let source = source.into();
    validate_username(&source).map_err(|_| Error::UnsafeSource(source.clone()))?;
    Ok(Self { root: root.into(), source })
  }

  pub fn root(&self) -> &Path { &self.root }

  pub fn source(&self) -> &str { &self.source }

  /// The directory holding every contributor file of `kind`.
  pub fn dir(&self, kind: RecordKind) -> PathBuf {
    self.root.join(&self.source).join(kind.as_ref())
  }

  /// The file holding `contributor`'s records of `kind`.
  ///
  /// Fails for usernames that are not a single safe path segment.
  pub fn file(&self, kind: RecordKind, contributor: &str) -> Result<PathBuf> {
    validate_username(contributor)?;
    Ok(self.dir(kind).join(format!("{contributor}.json")))
  }
}
