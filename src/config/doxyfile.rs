//! Doxyfile parsing.
//!
//! The dialect is line oriented:
//!
//! ```text
//! # Doxyfile 1.9.1
//! PROJECT_NAME     = "My Project"
//! GENERATE_XML     = YES
//! INPUT            = src/a.h \
//!                    src/b.h
//! ```
//!
//! Keys are case-insensitive and stored in lower case. A trailing `\` turns an
//! entry into an ordered list that continues on the following lines. The
//! header comment on the first line becomes the `version` entry.
//!
//! The parser is permissive: lines it cannot make sense of are skipped, never
//! reported as errors. [`ConfigMap::skipped`] lists them for callers that care.

use super::error::ConfigError;
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::{fs, path::Path};

/// Marker the generator writes at the start of the first line.
const HEADER_MARKER: &str = "# Doxyfile";

/// Version recorded when the header line is missing or names no version.
const UNKNOWN_VERSION: &str = "unknown";

const COMMENT: char = '#';
const CONTINUATION: char = '\\';

/// A parsed configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Scalar(String),
    List(Vec<String>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(_) => None,
        }
    }

    #[cfg(test)]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Scalar(_) => None,
            Self::List(items) => Some(items),
        }
    }
}

/// Ordered mapping of lower-case keys to values.
///
/// Keys are unique: inserting an existing key replaces its value in place,
/// whether the old value was a scalar or a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMap {
    entries: Vec<(String, ConfigValue)>,
    skipped: Vec<usize>,
}

impl ConfigMap {
    /// Load and parse a Doxyfile.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Ok(Self::from_str(&content))
    }

    /// Parse Doxyfile content. Never fails.
    pub fn from_str(content: &str) -> Self {
        let mut map = Self::default();
        map.insert("version", ConfigValue::Scalar(header_version(content).to_owned()));

        let mut pending: Option<PendingList> = None;

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;

            if let Some(list) = pending.as_mut() {
                match Line::classify(raw) {
                    Line::Comment => {}
                    Line::Blank => map.seal(pending.take()),
                    Line::Continued(body) => list.push(body),
                    Line::Assign(_) | Line::Malformed => {
                        list.push(raw);
                        map.seal(pending.take());
                    }
                }
                continue;
            }

            match Line::classify(raw) {
                Line::Blank | Line::Comment => {}
                Line::Continued(body) => {
                    let list = match split_entry(body) {
                        Some((key, value)) => PendingList::new(Some(key), value),
                        None => {
                            map.skipped.push(line_no);
                            PendingList::new(None, "")
                        }
                    };
                    pending = Some(list);
                }
                Line::Assign((key, value)) => {
                    if !value.is_empty() {
                        map.insert(&key, ConfigValue::Scalar(normalize_bool(value).to_owned()));
                    }
                }
                Line::Malformed => map.skipped.push(line_no),
            }
        }
        map.seal(pending);

        map
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        let key = normalize_key(key);
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Scalar lookup; lists yield `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 1-based numbers of lines ignored as malformed.
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    fn insert(&mut self, key: &str, value: ConfigValue) {
        let key = normalize_key(key);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    fn seal(&mut self, pending: Option<PendingList>) {
        if let Some(PendingList { key: Some(key), values }) = pending
            && !values.is_empty()
        {
            self.insert(&key, ConfigValue::List(values));
        }
    }
}

impl Serialize for ConfigMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// How a single line is treated when no list is pending.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Comment,
    /// Ends with `\`; holds the line without the marker.
    Continued(&'a str),
    /// `KEY = value`, key normalized and value trimmed.
    Assign((String, &'a str)),
    /// No `=` and no continuation marker. Skipped.
    Malformed,
}

impl<'a> Line<'a> {
    fn classify(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Blank;
        }
        if trimmed.starts_with(COMMENT) {
            return Self::Comment;
        }
        if let Some(body) = trimmed.strip_suffix(CONTINUATION) {
            return Self::Continued(body);
        }
        match split_entry(trimmed) {
            Some(entry) => Self::Assign(entry),
            None => Self::Malformed,
        }
    }
}

/// Values collected for a `\`-continued entry.
///
/// `key` is `None` when the first line had no `=`; such a list is consumed
/// and dropped.
struct PendingList {
    key: Option<String>,
    values: Vec<String>,
}

impl PendingList {
    fn new(key: Option<String>, first: &str) -> Self {
        let mut list = Self { key, values: Vec::new() };
        list.push(first);
        list
    }

    fn push(&mut self, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.values.push(value.to_owned());
        }
    }
}

/// Split on the first `=` into a normalized key and trimmed value.
fn split_entry(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once('=')?;
    Some((normalize_key(key), value.trim()))
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

/// Whole-value rewrite of the dialect's booleans.
fn normalize_bool(value: &str) -> &str {
    match value {
        "YES" => "true",
        "NO" => "false",
        other => other,
    }
}

/// Version named by the `# Doxyfile <version>` header, if any.
fn header_version(content: &str) -> &str {
    content
        .lines()
        .next()
        .and_then(|first| first.trim().strip_prefix(HEADER_MARKER))
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .unwrap_or(UNKNOWN_VERSION)
}
