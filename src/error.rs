//! Error taxonomy shared by validation, compilation and the collaborators.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::PlatformType;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Invalid component specification at `{path}`: {message}")]
    SpecificationInvalid { path: String, message: String },

    #[error("Argument `{argument}` has unsupported type `{type_name}`")]
    UnsupportedArgumentType { argument: String, type_name: String },

    #[error("Schema not found: {location}")]
    SchemaNotFound { location: String },

    #[error("Schema {location} is malformed: {reason}")]
    SchemaMalformed { location: String, reason: String },

    #[error("Cannot parse `{value}` as {platform_type} for parameter `{parameter}`")]
    ValueParse {
        parameter: String,
        platform_type: PlatformType,
        value: String,
    },

    #[error("No value parser registered for platform type {platform_type}")]
    NoValueParser { platform_type: PlatformType },

    #[error("Unknown input parameter: {0}")]
    UnknownParameter(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Explorer launch failed: {0}")]
    Explorer(String),
}

impl SpecError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by the user's document rather than the environment.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::SpecificationInvalid { .. }
                | Self::UnsupportedArgumentType { .. }
                | Self::ValueParse { .. }
                | Self::NoValueParser { .. }
                | Self::UnknownParameter(_)
                | Self::Yaml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SpecError>;
