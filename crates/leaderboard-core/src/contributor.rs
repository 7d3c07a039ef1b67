//! The contributor: the participant every activity and badge is attributed to.
//!
//! The username doubles as the identity key in the store and as the file name
//! of the contributor's exported JSON files, so it must be a single safe path
//! segment before it reaches the filesystem.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A participant identified by a unique username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
  pub username:   String,
  #[serde(default)]
  pub name:       Option<String>,
  #[serde(default)]
  pub role:       Option<String>,
  #[serde(default)]
  pub avatar_url: Option<String>,
  #[serde(default)]
  pub meta:       Option<serde_json::Value>,
}

impl Contributor {
  /// A contributor known only by username.
  pub fn new(username: impl Into<String>) -> Self {
    Self {
      username:   username.into(),
      name:       None,
      role:       None,
      avatar_url: None,
      meta:       None,
    }
  }
}

/// Check that `username` can be used verbatim as a single file-name segment.
///
/// Rejects the empty string, `.` and `..`, path separators of any platform,
/// and control characters (including NUL).
pub fn validate_username(username: &str) -> Result<()> {
  let unsafe_name = username.is_empty()
    || username == "."
    || username == ".."
    || username
      .chars()
      .any(|c| c == '/' || c == '\\' || c.is_control());

  if unsafe_name {
    return Err(Error::UnsafeUsername(username.to_owned()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ordinary_usernames_are_accepted() {
    for name in ["alice", "bob-the-builder", "carol_99", "dependabot[bot]", ".hidden"] {
      assert!(validate_username(name).is_ok(), "{name}");
    }
  }

  #[test]
  fn path_like_usernames_are_rejected() {
    for name in ["", ".", "..", "a/b", "../etc", "a\\b", "nul\0byte", "tab\there"] {
      assert!(
        matches!(validate_username(name), Err(Error::UnsafeUsername(_))),
        "{name:?}"
      );
    }
  }
}
