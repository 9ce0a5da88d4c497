//! Versioned artifact documents
//!
//! Reading an artifact checks its schema tag before the body is parsed, so a
//! document written for another schema is rejected rather than half-parsed.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::version::SchemaVersion;

/// A JSON document tagged with a fixed schema version
pub trait VersionedArtifact: Serialize + DeserializeOwned {
    /// Schema this document kind is written with
    const SCHEMA_VERSION: SchemaVersion;

    /// Parse an artifact, rejecting documents tagged with another schema
    fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ArtifactError::ParseError(e.to_string()))?;

        let found = value
            .get("metadata")
            .and_then(|metadata| metadata.get("dbt_schema_version"))
            .and_then(|tag| tag.as_str())
            .ok_or(ArtifactError::MissingSchemaVersion)?;

        if !Self::SCHEMA_VERSION.matches(found) {
            return Err(ArtifactError::IncompatibleSchema {
                expected: Self::SCHEMA_VERSION.url(),
                found: found.to_string(),
            });
        }

        serde_json::from_value(value).map_err(|e| ArtifactError::ParseError(e.to_string()))
    }

    /// Serialize to a pretty-printed JSON string
    fn to_json(&self) -> Result<String, ArtifactError> {
        serde_json::to_string_pretty(self).map_err(|e| ArtifactError::SerializeError(e.to_string()))
    }
}

/// Artifact read/write errors
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to parse artifact JSON: {0}")]
    ParseError(String),

    #[error("Failed to serialize artifact: {0}")]
    SerializeError(String),

    #[error("Artifact has no metadata.dbt_schema_version")]
    MissingSchemaVersion,

    #[error("Incompatible artifact schema: expected {expected}, found {found}")]
    IncompatibleSchema { expected: String, found: String },
}
