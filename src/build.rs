//! Conversion run orchestration.
//!
//! # Stages
//!
//! ```text
//! run()
//!     │
//!     ├── validate()          Doxyfile present, generator installed
//!     ├── generate_source()   <generator> <Doxyfile>, exit code forwarded
//!     ├── ConfigMap           parse Doxyfile → version, output/XML dirs
//!     ├── check_version()     version is one path segment (with subdirectories)
//!     ├── layout()            PathSet, page directory created
//!     ├── doxyfile.json       the parsed configuration as data
//!     ├── transform_all()     each XML file → JSON data + stub page
//!     ├── cleanup_xml()       unless --keep-xml
//!     └── generate_index()    only with version subdirectories
//! ```
//!
//! Any failure stops the run where it happens. In particular a file that does
//! not match its schema aborts before cleanup, so the XML stays on disk.

use crate::{
    config::{ConfigError, ConfigMap, PathSet, RunConfig, paths::absolute},
    exec,
    index::generate_index,
    log,
    output::{self, DocumentRecord, PageStatus},
    transform::XmlToJson,
    utils::git,
};
use anyhow::{Context, Result, bail};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

/// Name fragments of generator outputs that are not documents.
const SKIPPED_PATTERNS: &[&str] = &[".xsd", ".xslt", "dir_"];

/// Data file holding the parsed Doxyfile.
const CONFIG_DATA_FILE: &str = "doxyfile.json";

/// Errors that end a run with a specific exit code.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("`{command}` failed with exit code {code}")]
    GeneratorFailure { command: String, code: i32 },

    #[error("`{0}` doesn't exist or is not a directory")]
    DestinationNotFound(PathBuf),

    #[error("Invalid tag name `{0}`")]
    InvalidTag(String),
}

impl BuildError {
    /// Process exit code: the generator's own code when it failed, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::GeneratorFailure { code, .. } => {
                u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1)
            }
            _ => 1,
        }
    }
}

/// What a run produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub converted: usize,
    pub pages_created: usize,
    pub pages_skipped: usize,
    pub index: Option<PathBuf>,
}

/// Run the whole conversion.
pub fn run(config: RunConfig) -> Result<BuildSummary> {
    config.validate()?;

    if config.generate {
        generate_source(&config)?;
    }

    let map = ConfigMap::from_path(&config.doxyfile)?;
    if !map.skipped().is_empty() {
        log!("config"; "ignored malformed lines {:?} in {}", map.skipped(), config.doxyfile.display());
    }

    let mut config = config.with_doxyfile(&map);
    if config.git_version {
        config.version = git::release_version(Path::new("."))?;
    }
    if config.use_subdirs {
        git::check_version(&config.version)?;
    }
    log!("config"; "{} entries, version {}", map.len(), config.version);

    let paths = config.layout();
    fs::create_dir_all(&paths.markdown_dir)
        .with_context(|| format!("Failed to create {}", paths.markdown_dir.display()))?;

    output::write_data(
        &paths.data_dir.join(CONFIG_DATA_FILE),
        &serde_json::to_string_pretty(&map)?,
    )?;

    let mut summary = transform_all(&config, &paths)?;

    if !config.keep_xml {
        cleanup_xml(&config.xml_dir)?;
    }

    if let Some(index_dir) = &paths.index_dir {
        let generated: Vec<PathBuf> =
            config.generated_dirs.iter().map(|dir| absolute(dir)).collect();
        summary.index = Some(generate_index(index_dir, &generated)?);
    }

    log!(
        "done";
        "{} files converted, {} pages created, {} pages kept",
        summary.converted, summary.pages_created, summary.pages_skipped
    );
    Ok(summary)
}

/// Run the documentation generator on the Doxyfile and wait for it.
fn generate_source(config: &RunConfig) -> Result<()> {
    log!("doxygen"; "generating XML from {}...", config.doxyfile.display());

    let output = exec!(&config.generator; config.doxyfile.as_os_str())?;
    if !output.status.success() {
        bail!(BuildError::GeneratorFailure {
            command: config.generator.join(" "),
            code: output.status.code().unwrap_or(1),
        });
    }
    Ok(())
}

/// Convert every document in the XML directory.
fn transform_all(config: &RunConfig, paths: &PathSet) -> Result<BuildSummary> {
    if !config.xml_dir.is_dir() {
        bail!(ConfigError::NotFound(config.xml_dir.clone()));
    }

    let transform = XmlToJson::new(&config.compound_schema);
    let mut summary = BuildSummary::default();

    for file in xml_inputs(&config.xml_dir)? {
        let Some(record) = DocumentRecord::from_path(&file) else {
            continue;
        };
        let json = transform
            .transform(&file)
            .with_context(|| format!("Failed to convert {}", file.display()))?;

        match output::write_record(&record, &json, &paths.data_dir, &paths.markdown_dir)? {
            PageStatus::Created => summary.pages_created += 1,
            PageStatus::Skipped => summary.pages_skipped += 1,
        }
        summary.converted += 1;
    }

    Ok(summary)
}

/// Regular files in `dir` that are documents, by name.
fn xml_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let skipped = {
            let name = entry.file_name().to_string_lossy();
            SKIPPED_PATTERNS.iter().any(|p| name.contains(p))
        };
        if entry.file_type().is_file() && !skipped {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn cleanup_xml(xml_dir: &Path) -> Result<()> {
    if xml_dir.exists() {
        log!("clean"; "removing {}...", xml_dir.display());
        fs::remove_dir_all(xml_dir)
            .with_context(|| format!("Failed to remove {}", xml_dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{output::PAGE_FRONT_MATTER, transform::TransformError};
    use tempfile::TempDir;

    const INDEX_XSD: &str = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <xsd:element name="doxygenindex" type="DoxygenType"/>
</xsd:schema>"#;

    const COMPOUND_XSD: &str = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <xsd:element name="doxygen" type="DoxygenType"/>
</xsd:schema>"#;

    const INDEX_XML: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='no'?>
<doxygenindex xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="index.xsd" version="1.9.1">
  <compound refid="classfoo" kind="class"><name>Foo</name></compound>
</doxygenindex>"#;

    const CLASS_XML: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='no'?>
<doxygen version="1.9.1">
  <compounddef id="classfoo" kind="class" final="no">
    <compoundname>Foo</compoundname>
    <briefdescription><para>A <ref refid="classbar">Bar</ref> user.</para></briefdescription>
  </compounddef>
</doxygen>"#;

    /// A project whose XML output already exists.
    struct Project {
        dir: TempDir,
    }

    impl Project {
        fn new(doxyfile_extra: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            let out = root.join("docs/out");
            let xml = out.join("xml");
            fs::create_dir_all(&xml).unwrap();
            fs::create_dir_all(root.join("schema")).unwrap();

            fs::write(
                root.join("Doxyfile"),
                format!(
                    "# Doxyfile 1.9.1\nPROJECT_NUMBER = 1.2.3\nOUTPUT_DIRECTORY = {}\nINPUT = a.h \\\n b.h\n{doxyfile_extra}",
                    out.display()
                ),
            )
            .unwrap();
            fs::write(root.join("schema/compound.xsd"), COMPOUND_XSD).unwrap();

            fs::write(xml.join("index.xml"), INDEX_XML).unwrap();
            fs::write(xml.join("index.xsd"), INDEX_XSD).unwrap();
            fs::write(xml.join("classfoo.xml"), CLASS_XML).unwrap();
            fs::write(xml.join("compound.xsd"), COMPOUND_XSD).unwrap();
            fs::write(xml.join("combine.xslt"), "<xsl/>").unwrap();
            fs::write(xml.join("dir_68267d1309a1af8e8297ef4c3efbcdba.xml"), "<broken").unwrap();

            Self { dir }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn config(&self, use_subdirs: bool) -> RunConfig {
            RunConfig {
                doxyfile: self.root().join("Doxyfile"),
                compound_schema: self.root().join("schema/compound.xsd"),
                use_subdirs,
                generate: false,
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_build_error_exit_code() {
        let failure = |code| BuildError::GeneratorFailure { command: "doxygen".into(), code };
        assert_eq!(failure(2).exit_code(), 2);
        assert_eq!(failure(0).exit_code(), 1);
        assert_eq!(failure(-1).exit_code(), 1);
        assert_eq!(BuildError::DestinationNotFound(PathBuf::from("api")).exit_code(), 1);
        assert_eq!(BuildError::InvalidTag("a b".into()).exit_code(), 1);
    }

    #[test]
    fn test_xml_inputs_skip_non_documents() {
        let project = Project::new("");
        let xml = project.root().join("docs/out/xml");
        fs::create_dir(xml.join("nested.xml")).unwrap();

        let names: Vec<String> = xml_inputs(&xml)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["classfoo.xml", "index.xml"]);
    }

    #[test]
    fn test_run_versioned_layout() {
        let project = Project::new("");
        let root = project.root();

        let summary = run(project.config(true)).unwrap();

        let data = root.join("docs/_data/out/1.2.3");
        let pages = root.join("docs/out/1.2.3");
        assert_eq!(summary.converted, 2);
        assert_eq!(summary.pages_created, 2);
        assert_eq!(summary.index, Some(root.join("docs/out/index.md")));

        assert!(data.join("classfoo.json").is_file());
        assert!(data.join("index.json").is_file());
        assert!(!data.join("dir_68267d1309a1af8e8297ef4c3efbcdba.json").exists());
        assert_eq!(fs::read_to_string(pages.join("classfoo.md")).unwrap(), PAGE_FRONT_MATTER);
        assert!(pages.join("index.md").is_file());

        let class: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(data.join("classfoo.json")).unwrap()).unwrap();
        assert_eq!(class["version"], "1.9.1");
        assert_eq!(class["compounddef"]["id"], "classfoo");
        assert_eq!(class["compounddef"]["final"], "false");
        assert_eq!(class["compounddef"]["briefdescription"]["para"]["value"], "A  user.");
        assert_eq!(class["compounddef"]["briefdescription"]["para"]["ref"]["refid"], "classbar");

        let doxyfile: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(data.join(CONFIG_DATA_FILE)).unwrap())
                .unwrap();
        assert_eq!(doxyfile["version"], "1.9.1");
        assert_eq!(doxyfile["project_number"], "1.2.3");
        assert_eq!(doxyfile["input"], serde_json::json!(["a.h", "b.h"]));

        // Intermediate XML removed before the index is written
        assert!(!root.join("docs/out/xml").exists());
        let index = fs::read_to_string(root.join("docs/out/index.md")).unwrap();
        assert_eq!(index, "---\ntitle: \"API\"\n---\n- [1.2.3](1.2.3)\n");
    }

    #[test]
    fn test_run_flat_layout_without_index() {
        let project = Project::new("");
        let root = project.root();

        let summary = run(project.config(false)).unwrap();

        assert_eq!(summary.index, None);
        assert!(root.join("docs/_data/out/classfoo.json").is_file());
        assert!(root.join("docs/out/classfoo.md").is_file());
        // index.xml gets an ordinary stub page, not a version index
        let index_stub = fs::read_to_string(root.join("docs/out/index.md")).unwrap();
        assert_eq!(index_stub, PAGE_FRONT_MATTER);
    }

    #[test]
    fn test_rerun_keeps_pages_and_refreshes_data() {
        let project = Project::new("");
        let root = project.root();
        let config = RunConfig { keep_xml: true, ..project.config(true) };

        run(config.clone()).unwrap();
        assert!(root.join("docs/out/xml").is_dir());
        let index = fs::read_to_string(root.join("docs/out/index.md")).unwrap();
        assert_eq!(index, "---\ntitle: \"API\"\n---\n- [1.2.3](1.2.3)\n");

        let page = root.join("docs/out/1.2.3/classfoo.md");
        fs::write(&page, "edited").unwrap();
        let data = root.join("docs/_data/out/1.2.3/classfoo.json");
        fs::write(&data, "stale").unwrap();

        let summary = run(config).unwrap();
        assert_eq!(summary.pages_created, 0);
        assert_eq!(summary.pages_skipped, 2);
        assert_eq!(fs::read_to_string(&page).unwrap(), "edited");
        assert_ne!(fs::read_to_string(&data).unwrap(), "stale");
    }

    #[test]
    fn test_schema_violation_aborts_and_keeps_xml() {
        let project = Project::new("");
        let xml = project.root().join("docs/out/xml");
        fs::write(xml.join("classbroken.xml"), "<unexpected/>").unwrap();

        let err = run(project.config(true)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransformError>(),
            Some(TransformError::SchemaValidation { .. })
        ));
        assert!(xml.is_dir());
        assert!(!project.root().join("docs/out/index.md").exists());
    }

    #[test]
    fn test_version_with_separator_rejected() {
        for version in ["1.0/rc1", "../../x"] {
            let project = Project::new(&format!("PROJECT_NUMBER = {version}\n"));
            let err = run(project.config(true)).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<BuildError>(),
                Some(BuildError::InvalidTag(_))
            ));
            assert!(!project.root().join("docs/_data").exists());
            assert!(project.root().join("docs/out/xml").is_dir());
        }
    }

    #[test]
    fn test_flat_layout_ignores_version_shape() {
        let project = Project::new("PROJECT_NUMBER = 1.0 beta\n");
        run(project.config(false)).unwrap();
        assert!(project.root().join("docs/_data/out/classfoo.json").is_file());
    }

    #[test]
    fn test_missing_doxyfile() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig {
            doxyfile: dir.path().join("Doxyfile"),
            generate: false,
            ..Default::default()
        };
        let err = run(config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_xml_directory() {
        let project = Project::new("XML_OUTPUT = nowhere\n");
        let err = run(project.config(false)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_generator_failure_forwards_exit_code() {
        let project = Project::new("");
        let config = RunConfig {
            generator: vec!["sh".into(), "-c".into(), "exit 7".into()],
            generate: true,
            ..project.config(false)
        };

        let err = run(config).unwrap_err();
        let build_err = err.downcast_ref::<BuildError>().unwrap();
        assert!(matches!(build_err, BuildError::GeneratorFailure { code: 7, .. }));
        assert_eq!(build_err.exit_code(), 7);

        // Nothing converted after a failed generation
        assert!(!project.root().join("docs/_data").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_generator_runs_before_conversion() {
        let project = Project::new("");
        let xml = project.root().join("docs/out/xml");
        let script = format!("cp '{}' '{}'", xml.join("classfoo.xml").display(), xml.join("structbar.xml").display());
        let config = RunConfig {
            generator: vec!["sh".into(), "-c".into(), script],
            generate: true,
            ..project.config(false)
        };

        let summary = run(config).unwrap();
        assert_eq!(summary.converted, 3);
        assert!(project.root().join("docs/_data/out/structbar.json").is_file());
    }
}
