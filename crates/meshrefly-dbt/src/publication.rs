//! Publication artifacts
//!
//! A publication is the snapshot a project exports so that downstream
//! projects can `ref()` its public models without re-running its build.
//! The full [`PublicationArtifact`] is what gets published; the reduced
//! [`PublicationConfig`] is what a consumer keeps inside its own manifest.

use chrono::{DateTime, Utc};
use meshrefly_core::{
    AccessType, ArtifactMetadata, NodeType, NodeVersion, ProjectConfig, SchemaVersion,
    VersionedArtifact,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Header of a publication document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    /// Generic artifact header; its schema tag is always the publication tag
    #[serde(flatten)]
    pub base: ArtifactMetadata,

    /// Warehouse adapter the relations were built with
    #[serde(default)]
    pub adapter_type: Option<String>,

    /// Quoting settings, carried opaquely for identifier rendering
    #[serde(default)]
    pub quoting: HashMap<String, serde_json::Value>,
}

impl PublicationMetadata {
    pub fn new() -> Self {
        Self {
            base: ArtifactMetadata::new(PublicationArtifact::SCHEMA_VERSION),
            adapter_type: None,
            quoting: HashMap::new(),
        }
    }

    /// Header carrying the adapter and quoting settings of a project
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            adapter_type: config.adapter_type.clone(),
            quoting: config.quoting.clone(),
            ..Self::new()
        }
    }

    pub fn with_adapter_type(mut self, adapter_type: impl Into<String>) -> Self {
        self.adapter_type = Some(adapter_type.into());
        self
    }

    pub fn dbt_schema_version(&self) -> &str {
        &self.base.dbt_schema_version
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.base.generated_at
    }
}

impl Default for PublicationMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// A model exported by another project
///
/// This is a terminal reference stub: it is always public, always resolves
/// as [`NodeType::PublicModel`], and never expands into further graph edges
/// through the generic `depends_on_*` accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicModel {
    pub name: String,
    pub package_name: String,
    pub unique_id: String,

    /// Fully rendered relation (e.g. `"analytics"."finance"."orders"`)
    pub relation_name: String,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub version: Option<NodeVersion>,

    #[serde(default)]
    pub latest_version: Option<NodeVersion>,

    /// Unique ids of the public models this one is built from
    #[serde(default)]
    pub public_node_dependencies: Vec<String>,

    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,

    #[serde(default)]
    pub deprecation_date: Option<DateTime<Utc>>,
}

impl PublicModel {
    /// Create an unversioned public model stamped with the current time
    pub fn new(
        name: impl Into<String>,
        package_name: impl Into<String>,
        unique_id: impl Into<String>,
        relation_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            package_name: package_name.into(),
            unique_id: unique_id.into(),
            relation_name: relation_name.into(),
            database: None,
            schema: None,
            identifier: None,
            version: None,
            latest_version: None,
            public_node_dependencies: Vec::new(),
            generated_at: Utc::now(),
            deprecation_date: None,
        }
    }

    pub fn with_location(
        mut self,
        database: Option<String>,
        schema: Option<String>,
        identifier: Option<String>,
    ) -> Self {
        self.database = database;
        self.schema = schema;
        self.identifier = identifier;
        self
    }

    pub fn with_version(mut self, version: impl Into<NodeVersion>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_latest_version(mut self, latest_version: impl Into<NodeVersion>) -> Self {
        self.latest_version = Some(latest_version.into());
        self
    }

    pub fn with_dependencies(mut self, public_node_dependencies: Vec<String>) -> Self {
        self.public_node_dependencies = public_node_dependencies;
        self
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn with_deprecation_date(mut self, deprecation_date: DateTime<Utc>) -> Self {
        self.deprecation_date = Some(deprecation_date);
        self
    }

    /// True only for a versioned model whose version is the latest one.
    /// An unversioned model is never "latest".
    pub fn is_latest_version(&self) -> bool {
        self.version.is_some() && self.version == self.latest_version
    }

    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }

    pub fn resource_type(&self) -> NodeType {
        NodeType::PublicModel
    }

    pub fn access(&self) -> AccessType {
        AccessType::Public
    }

    pub fn is_public_node(&self) -> bool {
        true
    }

    /// Lookup name used by ref resolution: `name` or `name.v<version>`
    pub fn search_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}.v{}", self.name, version),
            None => self.name.clone(),
        }
    }

    /// Always empty; see [`PublicModel::public_node_dependencies`]
    pub fn depends_on_nodes(&self) -> &[String] {
        &[]
    }

    /// Always empty; see [`PublicModel::public_node_dependencies`]
    pub fn depends_on_public_nodes(&self) -> &[String] {
        &[]
    }

    /// `[package_name, name]`; the version is not part of the FQN
    pub fn fqn(&self) -> Vec<String> {
        vec![self.package_name.clone(), self.name.clone()]
    }

    pub fn alias(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Field dump for listing and docs tooling, with an explicit
    /// `resource_type`. `omit_none` drops null fields.
    pub fn to_presentation_value(
        &self,
        omit_none: bool,
    ) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;

        if let serde_json::Value::Object(fields) = &mut value {
            if omit_none {
                fields.retain(|_, field| !field.is_null());
            }

            fields.insert(
                "resource_type".to_string(),
                serde_json::Value::String(NodeType::PublicModel.as_str().to_string()),
            );
        }

        Ok(value)
    }
}

/// Full publication document, as published by the producing project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationArtifact {
    pub project_name: String,

    /// Public models keyed by their unique_id
    #[serde(default)]
    pub public_models: BTreeMap<String, PublicModel>,

    #[serde(default)]
    pub metadata: PublicationMetadata,

    /// Names of the projects this publication depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PublicationArtifact {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            public_models: BTreeMap::new(),
            metadata: PublicationMetadata::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: PublicationMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_public_model(mut self, model: PublicModel) -> Self {
        self.insert_public_model(model);
        self
    }

    /// Insert a model under its own unique_id, returning any model it replaces
    pub fn insert_public_model(&mut self, model: PublicModel) -> Option<PublicModel> {
        self.public_models.insert(model.unique_id.clone(), model)
    }

    pub fn get_public_model(&self, unique_id: &str) -> Option<&PublicModel> {
        self.public_models.get(unique_id)
    }

    /// Check every map key equals the unique_id of the model stored under it
    pub fn validate(&self) -> Result<(), PublicationError> {
        for (key, model) in &self.public_models {
            if key != &model.unique_id {
                return Err(PublicationError::KeyMismatch {
                    key: key.clone(),
                    unique_id: model.unique_id.clone(),
                });
            }
        }

        Ok(())
    }
}

impl VersionedArtifact for PublicationArtifact {
    const SCHEMA_VERSION: SchemaVersion = SchemaVersion::PUBLICATION;
}

/// The part of a publication stored inside a consumer's manifest
///
/// Public models themselves are stored separately in the manifest; only
/// their unique_ids are kept here. A config can only be derived from an
/// artifact, never turned back into one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationConfig {
    project_name: String,

    #[serde(default)]
    metadata: PublicationMetadata,

    #[serde(default)]
    dependencies: Vec<String>,

    #[serde(default)]
    public_node_ids: Vec<String>,
}

impl PublicationConfig {
    /// Reduce a full artifact to its embeddable summary
    pub fn from_publication(publication: &PublicationArtifact) -> Self {
        Self {
            project_name: publication.project_name.clone(),
            metadata: publication.metadata.clone(),
            dependencies: publication.dependencies.clone(),
            public_node_ids: publication.public_models.keys().cloned().collect(),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn metadata(&self) -> &PublicationMetadata {
        &self.metadata
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn public_node_ids(&self) -> &[String] {
        &self.public_node_ids
    }
}

impl VersionedArtifact for PublicationConfig {
    const SCHEMA_VERSION: SchemaVersion = SchemaVersion::PUBLICATION;
}

/// Publication consistency errors
#[derive(Debug, thiserror::Error)]
pub enum PublicationError {
    #[error("Public model stored under '{key}' has unique_id '{unique_id}'")]
    KeyMismatch { key: String, unique_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn orders(version: Option<&str>, latest: Option<&str>) -> PublicModel {
        let mut model = PublicModel::new(
            "orders",
            "pkg_b",
            "model.pkg_b.orders",
            "\"db\".\"schema\".\"orders\"",
        );
        model.version = version.map(NodeVersion::from);
        model.latest_version = latest.map(NodeVersion::from);
        model
    }

    #[test]
    fn unversioned_model() {
        let model = orders(None, Some("2"));

        assert!(!model.is_versioned());
        assert!(!model.is_latest_version());
        assert_eq!(model.search_name(), "orders");
    }

    #[test]
    fn latest_version_requires_equal_versions() {
        assert!(orders(Some("2"), Some("2")).is_latest_version());
        assert!(!orders(Some("1"), Some("2")).is_latest_version());
        assert!(!orders(Some("2"), None).is_latest_version());
    }

    #[test]
    fn search_name_carries_version() {
        assert_eq!(orders(Some("2"), Some("2")).search_name(), "orders.v2");
        assert_eq!(
            orders(None, None).with_version(3i64).search_name(),
            "orders.v3"
        );
    }

    #[test]
    fn whole_float_version_is_distinct_from_integer() {
        let float = orders(None, None).with_version(2.0f64);
        let integer = orders(None, None).with_version(2i64);

        assert_eq!(float.search_name(), "orders.v2.0");
        assert_ne!(float.search_name(), integer.search_name());
    }

    #[test]
    fn fqn_excludes_version() {
        let model = orders(Some("2"), Some("2"));
        assert_eq!(model.fqn(), vec!["pkg_b".to_string(), "orders".to_string()]);
    }

    #[test]
    fn capability_tags_are_constant() {
        let model = orders(Some("1"), Some("2"))
            .with_dependencies(vec!["model.pkg_b.customers".to_string()]);

        assert_eq!(model.resource_type(), NodeType::PublicModel);
        assert_eq!(model.access(), AccessType::Public);
        assert!(model.is_public_node());
        assert!(model.depends_on_nodes().is_empty());
        assert!(model.depends_on_public_nodes().is_empty());
        assert_eq!(model.public_node_dependencies.len(), 1);
    }

    #[test]
    fn alias_is_identifier() {
        let model = orders(None, None);
        assert_eq!(model.alias(), None);

        let model = model.with_location(
            Some("db".to_string()),
            Some("schema".to_string()),
            Some("orders_v2".to_string()),
        );
        assert_eq!(model.alias(), Some("orders_v2"));
    }

    #[test]
    fn generated_at_is_fixed_at_construction() {
        let model = orders(None, None);
        let first = serde_json::to_value(&model).unwrap();
        let second = serde_json::to_value(&model).unwrap();
        assert_eq!(first["generated_at"], second["generated_at"]);
    }

    #[test]
    fn presentation_value_has_resource_type() {
        let model = orders(Some("2"), Some("2"));

        let full = model.to_presentation_value(false).unwrap();
        assert_eq!(full["resource_type"], "public_model");
        assert_eq!(full["name"], "orders");
        assert!(full["database"].is_null());

        let compact = model.to_presentation_value(true).unwrap();
        assert_eq!(compact["resource_type"], "public_model");
        assert!(compact.get("database").is_none());
        assert!(compact.get("deprecation_date").is_none());
    }

    #[test]
    fn absent_optionals_serialize_as_null() {
        let value = serde_json::to_value(orders(None, None)).unwrap();
        assert!(value["identifier"].is_null());
        assert!(value["version"].is_null());
    }

    #[test]
    fn new_artifact_defaults() {
        let artifact = PublicationArtifact::new("pkg_b");

        assert!(artifact.public_models.is_empty());
        assert!(artifact.dependencies.is_empty());
        assert!(artifact.metadata.quoting.is_empty());
        assert!(SchemaVersion::PUBLICATION.matches(artifact.metadata.dbt_schema_version()));
    }

    #[test]
    fn validate_detects_key_mismatch() {
        let mut artifact = PublicationArtifact::new("pkg_b").with_public_model(orders(None, None));
        assert!(artifact.validate().is_ok());

        artifact
            .public_models
            .insert("model.pkg_b.wrong".to_string(), orders(None, None));
        assert!(matches!(
            artifact.validate(),
            Err(PublicationError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn config_from_empty_publication() {
        let artifact = PublicationArtifact::new("pkg_b");
        let config = PublicationConfig::from_publication(&artifact);

        assert_eq!(config.project_name(), "pkg_b");
        assert!(config.public_node_ids().is_empty());
        assert_eq!(config.metadata(), &artifact.metadata);
    }

    #[test]
    fn config_json_has_no_public_models() {
        let artifact = PublicationArtifact::new("pkg_b").with_public_model(orders(None, None));
        let value = serde_json::to_value(PublicationConfig::from_publication(&artifact)).unwrap();

        assert!(value.get("public_models").is_none());
        assert_eq!(value["public_node_ids"], serde_json::json!(["model.pkg_b.orders"]));
    }

    #[test]
    fn metadata_from_project_config() {
        let mut config = ProjectConfig::new("pkg_b");
        config.adapter_type = Some("postgres".to_string());
        config
            .quoting
            .insert("identifier".to_string(), serde_json::Value::Bool(true));

        let metadata = PublicationMetadata::from_config(&config);
        assert_eq!(metadata.adapter_type.as_deref(), Some("postgres"));
        assert_eq!(metadata.quoting, config.quoting);
        assert!(SchemaVersion::PUBLICATION.matches(metadata.dbt_schema_version()));
    }
}
