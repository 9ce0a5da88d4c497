//! Base artifact metadata
//!
//! Header fields shared by every artifact kind. Artifact-specific headers
//! flatten this struct into their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::version::SchemaVersion;

/// Version string written into freshly created headers
pub const DBT_VERSION: &str = "1.6.0";

/// Metadata common to all artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Schema tag URL (see [`SchemaVersion`])
    pub dbt_schema_version: String,

    /// Version of the tool that produced the artifact
    #[serde(default = "default_dbt_version")]
    pub dbt_version: String,

    /// When the artifact was generated
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,

    #[serde(default)]
    pub invocation_id: Option<String>,

    /// Environment variables recorded at generation time
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_dbt_version() -> String {
    DBT_VERSION.to_string()
}

impl ArtifactMetadata {
    /// Fresh header for the given schema, stamped with the current time
    pub fn new(schema: SchemaVersion) -> Self {
        Self {
            dbt_schema_version: schema.url(),
            dbt_version: default_dbt_version(),
            generated_at: Utc::now(),
            invocation_id: None,
            env: HashMap::new(),
        }
    }

    pub fn with_invocation_id(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = Some(invocation_id.into());
        self
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }
}
