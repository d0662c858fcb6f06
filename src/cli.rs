//! Command-line interface definitions.

use clap::Parser;
use std::path::PathBuf;

/// Convert Doxygen configuration and XML output to JSON data and Markdown pages
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Doxygen configuration file (default: Doxyfile)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Place pages and data in one subdirectory per project version and
    /// generate an index page listing the versions
    #[arg(short, long)]
    pub subdirs: bool,

    /// Schema for every XML file except index.xml
    /// (default: scripts/doxygen/compound.xsd)
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Documentation generator command and leading arguments (default: doxygen)
    #[arg(long, num_args = 1.., value_name = "CMD")]
    pub doxygen: Option<Vec<String>>,

    /// Reuse the existing XML output instead of running the generator
    #[arg(long)]
    pub no_generate: bool,

    /// Keep the intermediate XML output after conversion
    #[arg(long)]
    pub keep_xml: bool,

    /// Use the git tag at HEAD as version instead of PROJECT_NUMBER
    #[arg(long)]
    pub git_version: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["doxy2json"]).unwrap();
        assert_eq!(cli.input, None);
        assert!(!cli.subdirs);
        assert!(!cli.no_generate);
        assert!(!cli.keep_xml);
        assert!(!cli.git_version);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["doxy2json", "-i", "docs/Doxyfile", "-s"]).unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("docs/Doxyfile")));
        assert!(cli.subdirs);
    }

    #[test]
    fn test_generator_command_with_args() {
        let cli = Cli::try_parse_from([
            "doxy2json",
            "--doxygen",
            "nice",
            "doxygen",
            "--keep-xml",
        ])
        .unwrap();
        assert_eq!(cli.doxygen, Some(vec!["nice".to_string(), "doxygen".to_string()]));
        assert!(cli.keep_xml);
    }
}
