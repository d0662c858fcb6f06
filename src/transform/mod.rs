//! XML to JSON conversion.
//!
//! ```text
//! classfoo.xml ──► SchemaEngine::decode ──► rewrite ──► pretty JSON
//!                  (compound.xsd)           @id → id
//!                                           $   → value
//!                                           "no" → "false"
//! ```
//!
//! The rewrite works on the decoded value, never on serialized text, so string
//! content that happens to contain `"@`, `"$"` or `"no"` is left alone.

mod error;
mod schema;

pub use error::TransformError;
pub use schema::{SchemaEngine, XmlSchemaEngine};

use schema::{ATTRIBUTE_PREFIX, TEXT_KEY};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// The one file that is checked against its own co-located schema.
const INDEX_FILE: &str = "index.xml";
const INDEX_SCHEMA: &str = "index.xsd";

/// Key that replaces the engine's text content key.
const VALUE_KEY: &str = "value";

/// Converts generator XML files into JSON text for the site generator.
#[derive(Debug)]
pub struct XmlToJson<E = XmlSchemaEngine> {
    engine: E,
    compound_schema: PathBuf,
}

impl XmlToJson {
    pub fn new(compound_schema: &Path) -> Self {
        Self::with_engine(XmlSchemaEngine::default(), compound_schema)
    }
}

impl<E: SchemaEngine> XmlToJson<E> {
    pub fn with_engine(engine: E, compound_schema: &Path) -> Self {
        Self {
            engine,
            compound_schema: compound_schema.to_path_buf(),
        }
    }

    /// Schema governing `file`: `index.xml` uses the `index.xsd` beside it,
    /// every other file the shared compound schema.
    pub fn schema_for(&self, file: &Path) -> PathBuf {
        if file.file_name().is_some_and(|name| name == INDEX_FILE) {
            file.with_file_name(INDEX_SCHEMA)
        } else {
            self.compound_schema.clone()
        }
    }

    /// Decode, rewrite and serialize one file.
    pub fn transform(&self, file: &Path) -> Result<String, TransformError> {
        let decoded = self.engine.decode(file, &self.schema_for(file))?;
        Ok(serde_json::to_string_pretty(&rewrite(decoded))?)
    }
}

/// Post-order rewrite for the site generator's data conventions.
pub fn rewrite(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (rename_key(key), rewrite(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(rewrite).collect()),
        Value::String(s) if s == "no" => Value::String("false".into()),
        other => other,
    }
}

fn rename_key(key: String) -> String {
    if key == TEXT_KEY {
        return VALUE_KEY.to_owned();
    }
    match key.strip_prefix(ATTRIBUTE_PREFIX) {
        Some(name) => name.to_owned(),
        None => key,
    }
}
