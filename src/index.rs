//! Version index page.
//!
//! With one subdirectory per documentation version, the parent directory gets
//! an `index.md` linking each of them:
//!
//! ```markdown
//! ---
//! title: "API"
//! ---
//! - [1.0.0](1.0.0)
//! - [1.2.3](1.2.3)
//! ```

use crate::{build::BuildError, log};
use anyhow::{Context, Result, bail};
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Front matter of the index page.
pub const INDEX_FRONT_MATTER: &str = "---\ntitle: \"API\"\n---\n";

/// File name of the index page.
pub const INDEX_PAGE: &str = "index.md";

/// Write `dest_dir/index.md` listing every immediate subdirectory except those
/// in `exclude`, always replacing an existing index.
///
/// `exclude` holds absolute paths, compared against `dest_dir/<name>`.
pub fn generate_index(dest_dir: &Path, exclude: &[PathBuf]) -> Result<PathBuf> {
    if !dest_dir.is_dir() {
        bail!(BuildError::DestinationNotFound(dest_dir.to_path_buf()));
    }

    let names = version_dirs(dest_dir, exclude)?;
    let path = dest_dir.join(INDEX_PAGE);
    log!("index"; "Generating {} ({} versions)...", path.display(), names.len());

    fs::write(&path, render_index(&names))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Names of the immediate subdirectories, sorted by name.
fn version_dirs(dir: &Path, exclude: &[PathBuf]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if entry.file_type().is_dir() && !exclude.iter().any(|p| p == entry.path()) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn render_index(names: &[String]) -> String {
    let mut page = String::from(INDEX_FRONT_MATTER);
    for name in names {
        page.push_str(&format!("- [{name}]({name})\n"));
    }
    page
}
