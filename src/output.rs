//! Writing JSON data files and Markdown stub pages.
//!
//! JSON is regenerated on every run. Stub pages are scaffolded once and then
//! belong to whoever edits them: an existing page is never touched.

use crate::log;
use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

/// Front matter of a freshly scaffolded page.
pub const PAGE_FRONT_MATTER: &str = "---\nlayout: \"doxygen\"\nno_title_header: true\n---\n";

/// One XML input and the outputs named after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// File name without extension, e.g. `classfoo`.
    pub base: String,
}

impl DocumentRecord {
    pub fn from_path(path: &Path) -> Option<Self> {
        let base = path.file_stem()?.to_str()?;
        Some(Self { base: base.to_owned() })
    }

    pub fn json_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}.json", self.base))
    }

    pub fn page_path(&self, page_dir: &Path) -> PathBuf {
        page_dir.join(format!("{}.md", self.base))
    }
}

/// What happened to a stub page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Created,
    Skipped,
}

/// Write the JSON data file and, if absent, the stub page for one record.
pub fn write_record(
    record: &DocumentRecord,
    json: &str,
    data_dir: &Path,
    page_dir: &Path,
) -> Result<PageStatus> {
    write_data(&record.json_path(data_dir), json)?;
    write_stub(&record.page_path(page_dir))
}

/// Create parent directories and overwrite `path` with `json`.
pub fn write_data(path: &Path, json: &str) -> Result<()> {
    ensure_parent(path)?;
    log!("json"; "Generating {}...", path.display());
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Create `path` with the stub front matter unless it already exists.
fn write_stub(path: &Path) -> Result<PageStatus> {
    ensure_parent(path)?;

    let file = OpenOptions::new().write(true).create_new(true).open(path);
    let mut file = match file {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            log!("skip"; "Skipping {}...", path.display());
            return Ok(PageStatus::Skipped);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to create {}", path.display()));
        }
    };

    log!("page"; "Generating {}...", path.display());
    file.write_all(PAGE_FRONT_MATTER.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(PageStatus::Created)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
}
