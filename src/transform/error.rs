//! Transform error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning one XML file into JSON text.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("`{file}` does not conform to `{schema}`: {reason}")]
    SchemaValidation {
        file: PathBuf,
        schema: PathBuf,
        reason: String,
    },

    #[error("Invalid schema `{0}`: {1}")]
    InvalidSchema(PathBuf, String),

    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
}
