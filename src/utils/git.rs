//! Release versions: git tag lookup and the directory-name check shared with
//! `PROJECT_NUMBER`.

use crate::{build::BuildError, capture, config::defaults};
use anyhow::{Result, bail};
use regex::Regex;
use std::{path::Path, sync::LazyLock};

/// Characters allowed in a tag used as a directory name.
static RE_VALID_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z_\-.]+$").unwrap());

/// Tag pointing exactly at `HEAD` in the repository at `root`.
///
/// Falls back to `develop` when `HEAD` is untagged or `root` is not a
/// repository.
pub fn release_version(root: &Path) -> Result<String> {
    let output = capture!(root; ["git"]; "describe", "--exact-match", "--tags", "HEAD")?;
    let tag = if output.status.success() {
        String::from_utf8_lossy(&output.stdout).trim().to_owned()
    } else {
        String::new()
    };
    resolve_tag(&tag)
}

/// Validate a tag name, mapping the empty tag to the default.
fn resolve_tag(tag: &str) -> Result<String> {
    if tag.is_empty() {
        return Ok(defaults::git_version());
    }
    check_version(tag)?;
    Ok(tag.to_owned())
}

/// Reject versions that are not a single plain path segment.
pub fn check_version(version: &str) -> Result<()> {
    if !RE_VALID_TAG.is_match(version) || version.chars().all(|c| c == '.') {
        bail!(BuildError::InvalidTag(version.to_owned()));
    }
    Ok(())
}
