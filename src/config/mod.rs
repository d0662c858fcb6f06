//! Run configuration.
//!
//! A [`RunConfig`] is assembled once per invocation from two sources and then
//! passed by reference to every stage:
//!
//! | Source              | Fields                                           |
//! |---------------------|--------------------------------------------------|
//! | command line        | doxyfile, subdirs, schema, generator, flags      |
//! | parsed Doxyfile     | version, output directory, XML directory         |
//!
//! ```text
//! RunConfig::from_cli(&cli)      → validate()
//!     │
//!     └── with_doxyfile(&map)    → version / output_dir / xml_dir
//!             │
//!             └── layout()       → PathSet
//! ```

pub mod defaults;
pub mod doxyfile;
mod error;
pub mod paths;

pub use doxyfile::ConfigMap;
pub use error::ConfigError;
pub use paths::PathSet;

use crate::cli::Cli;
use anyhow::{Context, Result, bail};
use educe::Educe;
use std::path::PathBuf;

/// Doxygen output directory keys besides `XML_OUTPUT`, with their defaults.
const GENERATOR_OUTPUTS: &[(&str, &str)] = &[
    ("html_output", "html"),
    ("latex_output", "latex"),
    ("rtf_output", "rtf"),
    ("man_output", "man"),
    ("docbook_output", "docbook"),
];

/// Settings for one conversion run.
#[derive(Debug, Clone, Educe)]
#[educe(Default)]
pub struct RunConfig {
    /// Doxygen configuration file.
    #[educe(Default = defaults::doxyfile())]
    pub doxyfile: PathBuf,

    /// Nest pages and data under a per-version directory.
    pub use_subdirs: bool,

    /// Release identifier (`PROJECT_NUMBER` or git tag).
    #[educe(Default = defaults::version())]
    pub version: String,

    /// Root for Markdown pages (`OUTPUT_DIRECTORY`).
    #[educe(Default = defaults::output_dir())]
    pub output_dir: PathBuf,

    /// Directory holding the generator's XML output.
    #[educe(Default = defaults::output_dir().join(defaults::xml_dir()))]
    pub xml_dir: PathBuf,

    /// Schema shared by every XML file except `index.xml`.
    #[educe(Default = defaults::compound_schema())]
    pub compound_schema: PathBuf,

    /// Generator command and leading arguments.
    #[educe(Default = defaults::generator())]
    pub generator: Vec<String>,

    /// Run the generator before converting.
    #[educe(Default = true)]
    pub generate: bool,

    /// Keep the XML tree after conversion.
    pub keep_xml: bool,

    /// Take the version from the git tag at HEAD.
    pub git_version: bool,

    /// Directories the generator writes into, XML included.
    pub generated_dirs: Vec<PathBuf>,
}

impl RunConfig {
    /// Build from command-line arguments; unset options keep their defaults.
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = Self::default();
        Self::update_option(&mut config.doxyfile, cli.input.as_ref());
        Self::update_option(&mut config.compound_schema, cli.schema.as_ref());
        Self::update_option(&mut config.generator, cli.doxygen.as_ref());
        config.use_subdirs = cli.subdirs;
        config.generate = !cli.no_generate;
        config.keep_xml = cli.keep_xml;
        config.git_version = cli.git_version;
        config
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Fill in the fields the Doxyfile controls.
    ///
    /// A relative `XML_OUTPUT` is taken relative to `OUTPUT_DIRECTORY`, which is
    /// where Doxygen writes it.
    pub fn with_doxyfile(mut self, map: &ConfigMap) -> Self {
        if let Some(version) = map.get_str("project_number").map(unquote) {
            self.version = version.to_owned();
        }
        if let Some(output) = map.get_str("output_directory").map(unquote) {
            self.output_dir = PathBuf::from(output);
        }
        let xml = map
            .get_str("xml_output")
            .map(unquote)
            .map_or_else(defaults::xml_dir, PathBuf::from);
        self.xml_dir = self.under_output(xml);

        let mut generated = vec![self.xml_dir.clone()];
        for &(key, default) in GENERATOR_OUTPUTS {
            let dir = map.get_str(key).map(unquote).unwrap_or(default);
            generated.push(self.under_output(PathBuf::from(dir)));
        }
        self.generated_dirs = generated;
        self
    }

    fn under_output(&self, dir: PathBuf) -> PathBuf {
        if dir.is_absolute() { dir } else { self.output_dir.join(dir) }
    }

    /// Resolve output locations for this run.
    pub fn layout(&self) -> PathSet {
        paths::resolve(&self.output_dir, &self.version, self.use_subdirs)
    }

    /// Check preconditions before anything runs.
    pub fn validate(&self) -> Result<()> {
        if !self.doxyfile.is_file() {
            bail!(ConfigError::NotFound(self.doxyfile.clone()));
        }
        if self.generate {
            Self::check_command_installed("--doxygen", &self.generator)?;
        }
        Ok(())
    }

    /// Check if a command is installed and available
    fn check_command_installed(field: &str, command: &[String]) -> Result<()> {
        let Some(cmd) = command.first() else {
            bail!(ConfigError::Validation(format!(
                "{field} must have at least one element"
            )));
        };
        which::which(cmd)
            .with_context(|| format!("`{cmd}` not found. Please install it first."))?;
        Ok(())
    }
}

/// Strip one pair of surrounding double quotes.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
