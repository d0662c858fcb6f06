//! Default values for run configuration fields.

use std::path::PathBuf;

pub fn doxyfile() -> PathBuf {
    "Doxyfile".into()
}

/// Version used when `PROJECT_NUMBER` is not set.
pub fn version() -> String {
    "development".into()
}

/// Version used by `--git-version` when HEAD carries no tag.
pub fn git_version() -> String {
    "develop".into()
}

pub fn output_dir() -> PathBuf {
    ".".into()
}

pub fn xml_dir() -> PathBuf {
    "xml".into()
}

pub fn compound_schema() -> PathBuf {
    "scripts/doxygen/compound.xsd".into()
}

pub fn generator() -> Vec<String> {
    vec!["doxygen".into()]
}
