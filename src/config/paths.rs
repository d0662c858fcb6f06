//! Output path layout.
//!
//! Pages and data files live in sibling trees so that the site generator finds
//! data under its fixed top-level `_data` directory:
//!
//! ```text
//! output root: docs/out, version 1.2.3
//!
//!   use_subdirs = false            use_subdirs = true
//!   ─────────────────────          ───────────────────────────
//!   pages  docs/out                pages  docs/out/1.2.3
//!   data   docs/_data/out          data   docs/_data/out/1.2.3
//!   index  -                       index  docs/out/index.md
//! ```
//!
//! The data directory is derived from the absolute page directory: strip the
//! last one (or two, with version subdirectories) segments as the suffix, and
//! re-root that suffix under `<prefix>/_data`.

use std::path::{Component, Path, PathBuf};

/// Name of the site generator's data directory.
pub const DATA_DIR_NAME: &str = "_data";

/// Resolved output locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    /// Where Markdown stub pages are written.
    pub markdown_dir: PathBuf,
    /// Where JSON data files are written.
    pub data_dir: PathBuf,
    /// Parent of the per-version page directories, when versioning is enabled.
    pub index_dir: Option<PathBuf>,
}

/// Resolve the layout against the current working directory.
///
/// Falls back to `/` if the working directory is unavailable.
pub fn resolve(output_root: &Path, version: &str, use_subdirs: bool) -> PathSet {
    resolve_in(&working_dir(), output_root, version, use_subdirs)
}

/// Resolve the layout with relative roots taken from `base`. Performs no I/O.
pub fn resolve_in(base: &Path, output_root: &Path, version: &str, use_subdirs: bool) -> PathSet {
    let root = lexical_absolute(base, output_root);
    let markdown_dir = if use_subdirs { root.join(version) } else { root.clone() };

    let levels = if use_subdirs { 2 } else { 1 };
    let prefix = markdown_dir
        .ancestors()
        .nth(levels)
        .unwrap_or_else(|| markdown_dir.ancestors().last().unwrap_or(Path::new("/")));
    let suffix = markdown_dir.strip_prefix(prefix).unwrap_or(Path::new(""));
    let data_dir = prefix.join(DATA_DIR_NAME).join(suffix);

    PathSet {
        index_dir: use_subdirs.then_some(root),
        markdown_dir,
        data_dir,
    }
}

/// Absolute form of `path` against the current working directory, without
/// touching the filesystem.
pub fn absolute(path: &Path) -> PathBuf {
    lexical_absolute(&working_dir(), path)
}

fn working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
}

/// Join `path` onto `base` when relative and fold `.`/`..` without touching the
/// filesystem.
fn lexical_absolute(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() { path.to_path_buf() } else { base.join(path) };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CWD: &str = "/work/project";

    fn tail(path: &Path, n: usize) -> Vec<String> {
        let all: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        all[all.len() - n..].to_vec()
    }

    #[test]
    fn test_flat_layout() {
        let paths = resolve_in(Path::new(CWD), Path::new("docs/out"), "1.2.3", false);
        assert_eq!(paths.markdown_dir, PathBuf::from("/work/project/docs/out"));
        assert_eq!(paths.data_dir, PathBuf::from("/work/project/docs/_data/out"));
        assert_eq!(paths.index_dir, None);
    }

    #[test]
    fn test_versioned_layout() {
        let paths = resolve_in(Path::new(CWD), Path::new("docs/out"), "1.2.3", true);
        assert_eq!(paths.markdown_dir, PathBuf::from("/work/project/docs/out/1.2.3"));
        assert_eq!(paths.data_dir, PathBuf::from("/work/project/docs/_data/out/1.2.3"));
        assert_eq!(paths.index_dir, Some(PathBuf::from("/work/project/docs/out")));
    }

    #[test]
    fn test_single_segment_root_matches_jekyll_layout() {
        let paths = resolve_in(Path::new(CWD), Path::new("api"), "develop", true);
        assert_eq!(paths.markdown_dir, PathBuf::from("/work/project/api/develop"));
        assert_eq!(paths.data_dir, PathBuf::from("/work/project/_data/api/develop"));
    }

    #[test]
    fn test_absolute_root_ignores_base() {
        let paths = resolve_in(Path::new(CWD), Path::new("/srv/site/api"), "2.0", false);
        assert_eq!(paths.markdown_dir, PathBuf::from("/srv/site/api"));
        assert_eq!(paths.data_dir, PathBuf::from("/srv/site/_data/api"));
    }

    #[test]
    fn test_absolute_is_lexical() {
        let path = absolute(Path::new("docs/./out/../out/xml"));
        assert!(path.is_absolute());
        assert!(path.ends_with("docs/out/xml"));
        assert_eq!(absolute(Path::new("/srv/../srv/api")), PathBuf::from("/srv/api"));
    }

    #[test]
    fn test_dot_segments_folded() {
        let paths = resolve_in(Path::new(CWD), Path::new("./docs/../api/."), "v1", false);
        assert_eq!(paths.markdown_dir, PathBuf::from("/work/project/api"));
        assert_eq!(paths.data_dir, PathBuf::from("/work/project/_data/api"));
    }

    #[test]
    fn test_current_dir_root() {
        let paths = resolve_in(Path::new(CWD), Path::new("."), "v1", false);
        assert_eq!(paths.markdown_dir, PathBuf::from("/work/project"));
        assert_eq!(paths.data_dir, PathBuf::from("/work/_data/project"));
    }

    #[test]
    fn test_shallow_root_does_not_panic() {
        let paths = resolve_in(Path::new("/"), Path::new("/"), "v1", true);
        assert_eq!(paths.markdown_dir, PathBuf::from("/v1"));
        assert_eq!(paths.data_dir, PathBuf::from("/_data/v1"));
    }

    #[test]
    fn test_layout_invariants() {
        for root in ["api", "docs/out", "a/b/c/d", "/abs/site"] {
            for version in ["1.2.3", "development"] {
                let flat = resolve_in(Path::new(CWD), Path::new(root), version, false);
                let nested = resolve_in(Path::new(CWD), Path::new(root), version, true);

                // One segment deeper with version subdirectories
                assert_eq!(
                    nested.markdown_dir.components().count(),
                    flat.markdown_dir.components().count() + 1
                );
                assert_eq!(nested.markdown_dir.parent(), Some(flat.markdown_dir.as_path()));

                // Data and page trees share their trailing segments
                assert_eq!(tail(&flat.data_dir, 1), tail(&flat.markdown_dir, 1));
                assert_eq!(tail(&nested.data_dir, 2), tail(&nested.markdown_dir, 2));
                assert!(flat.data_dir.iter().any(|s| s == DATA_DIR_NAME));
                assert!(nested.data_dir.iter().any(|s| s == DATA_DIR_NAME));
            }
        }
    }
}
