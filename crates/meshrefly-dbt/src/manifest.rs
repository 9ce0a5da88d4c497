//! Internal manifest
//!
//! A project's own nodes plus everything it imported from upstream
//! publications. Imported public models live in `public_nodes`; the rest of
//! each publication is kept as a [`PublicationConfig`] so model bodies are
//! never stored twice.

use chrono::{DateTime, Utc};
use meshrefly_core::{
    AccessType, ArtifactMetadata, NodeType, NodeVersion, ProjectDependencies, SchemaVersion,
    VersionedArtifact,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dag::DependencyGraph;
use crate::publication::{
    PublicModel, PublicationArtifact, PublicationConfig, PublicationError, PublicationMetadata,
};

/// Internal manifest structure (subset of fields we care about)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Metadata about the manifest
    pub metadata: ArtifactMetadata,

    /// The project's own nodes
    #[serde(default)]
    pub nodes: HashMap<String, ManifestNode>,

    /// Public models imported from upstream publications
    #[serde(default)]
    pub public_nodes: HashMap<String, PublicModel>,

    /// One entry per imported publication
    #[serde(default)]
    pub publications: Vec<PublicationConfig>,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            metadata: ArtifactMetadata::new(Self::SCHEMA_VERSION),
            nodes: HashMap::new(),
            public_nodes: HashMap::new(),
            publications: Vec::new(),
        }
    }

    /// Add (or replace) one of the project's own nodes
    pub fn add_node(&mut self, node: ManifestNode) {
        self.nodes.insert(node.unique_id.clone(), node);
    }

    /// Get an imported public model by unique_id
    pub fn get_public_node(&self, unique_id: &str) -> Option<&PublicModel> {
        self.public_nodes.get(unique_id)
    }

    pub fn get_publication(&self, project_name: &str) -> Option<&PublicationConfig> {
        self.publications
            .iter()
            .find(|p| p.project_name() == project_name)
    }

    /// Import an upstream publication
    ///
    /// Public models go into `public_nodes`; the publication itself is kept
    /// only in its reduced form.
    pub fn add_publication(
        &mut self,
        publication: PublicationArtifact,
    ) -> Result<&PublicationConfig, ManifestError> {
        publication.validate()?;

        if self.get_publication(&publication.project_name).is_some() {
            return Err(ManifestError::DuplicatePublication(publication.project_name));
        }

        if let Some(id) = self.find_collision(&publication, &[]) {
            return Err(ManifestError::IdCollision(id));
        }

        let config = PublicationConfig::from_publication(&publication);

        tracing::debug!(
            project = %config.project_name(),
            public_models = config.public_node_ids().len(),
            "importing publication"
        );

        self.public_nodes.extend(publication.public_models);
        self.publications.push(config);

        let index = self.publications.len() - 1;
        Ok(&self.publications[index])
    }

    /// Drop a publication and every public node it contributed
    pub fn remove_publication(&mut self, project_name: &str) -> Option<PublicationConfig> {
        let index = self
            .publications
            .iter()
            .position(|p| p.project_name() == project_name)?;

        let config = self.publications.remove(index);
        for id in config.public_node_ids() {
            self.public_nodes.remove(id);
        }

        tracing::debug!(project = %project_name, "removed publication");
        Some(config)
    }

    /// Swap in a republished artifact for a project
    ///
    /// The previous publication stays in place if the new one cannot be
    /// imported.
    pub fn replace_publication(
        &mut self,
        publication: PublicationArtifact,
    ) -> Result<&PublicationConfig, ManifestError> {
        publication.validate()?;

        let replaced: Vec<String> = self
            .get_publication(&publication.project_name)
            .map(|config| config.public_node_ids().to_vec())
            .unwrap_or_default();

        if let Some(id) = self.find_collision(&publication, &replaced) {
            return Err(ManifestError::IdCollision(id));
        }

        self.remove_publication(&publication.project_name);
        self.add_publication(publication)
    }

    /// Import the publications of every declared upstream project
    ///
    /// Each declared project must have an artifact. Artifacts for projects
    /// that are not declared are skipped. Nothing is imported unless every
    /// declared publication can be.
    pub fn load_publications(
        &mut self,
        dependencies: &ProjectDependencies,
        publications: Vec<PublicationArtifact>,
    ) -> Result<(), ManifestError> {
        let mut by_project: HashMap<String, PublicationArtifact> = publications
            .into_iter()
            .map(|p| (p.project_name.clone(), p))
            .collect();

        let mut staged = self.clone();

        for dependency in &dependencies.projects {
            if staged.get_publication(&dependency.name).is_some() {
                tracing::debug!(project = %dependency.name, "publication already loaded");
                by_project.remove(&dependency.name);
                continue;
            }

            let publication = by_project
                .remove(&dependency.name)
                .ok_or_else(|| ManifestError::PublicationNotFound(dependency.name.clone()))?;

            staged.add_publication(publication)?;
        }

        for project_name in by_project.keys() {
            tracing::warn!(
                project = %project_name,
                "ignoring publication for a project that is not a declared dependency"
            );
        }

        *self = staged;
        Ok(())
    }

    /// Resolve a `ref()` to a refable node
    ///
    /// Without a version, a versioned model resolves to its latest version.
    /// The project's own nodes win over imported public nodes; among equal
    /// candidates the lowest unique_id wins.
    pub fn resolve_ref(
        &self,
        name: &str,
        package: Option<&str>,
        version: Option<&NodeVersion>,
    ) -> Option<ResolvedNode<'_>> {
        let target = match version {
            Some(v) => format!("{}.v{}", name, v),
            None => name.to_string(),
        };

        let matches = |node_name: &str, search_name: String, package_name: &str, latest: bool| {
            let name_matches =
                search_name == target || (version.is_none() && latest && node_name == name);
            name_matches && package.map_or(true, |p| p == package_name)
        };

        let own = self
            .nodes
            .values()
            .filter(|node| node.resource_type.is_refable() && node.config.enabled)
            .filter(|node| {
                matches(
                    &node.name,
                    node.search_name(),
                    &node.package_name,
                    node.is_latest_version(),
                )
            })
            .min_by(|a, b| a.unique_id.cmp(&b.unique_id));

        if let Some(node) = own {
            return Some(ResolvedNode::Manifest(node));
        }

        self.public_nodes
            .values()
            .filter(|node| {
                matches(
                    &node.name,
                    node.search_name(),
                    &node.package_name,
                    node.is_latest_version(),
                )
            })
            .min_by(|a, b| a.unique_id.cmp(&b.unique_id))
            .map(ResolvedNode::Public)
    }

    /// Build the publication this project exports
    ///
    /// Every enabled public model of `project_name` is exported. Its
    /// `public_node_dependencies` are all upstream public models, own or
    /// imported, sorted by unique_id.
    pub fn build_publication(
        &self,
        project_name: &str,
        metadata: PublicationMetadata,
        dependencies: Vec<String>,
    ) -> PublicationArtifact {
        let graph = DependencyGraph::from_manifest(self);
        let generated_at = metadata.generated_at();

        let mut publication = PublicationArtifact::new(project_name)
            .with_metadata(metadata)
            .with_dependencies(dependencies);

        for node in self.nodes.values() {
            if !Self::is_exported(node, project_name) {
                continue;
            }

            let mut public_dependencies: Vec<String> = graph
                .upstream(&node.unique_id)
                .into_iter()
                .filter(|id| self.is_exported_or_imported(id, project_name))
                .collect();
            public_dependencies.sort();

            let mut model = PublicModel::new(
                node.name.clone(),
                node.package_name.clone(),
                node.unique_id.clone(),
                node.relation_name.clone().unwrap_or_default(),
            )
            .with_location(node.database.clone(), node.schema.clone(), node.alias.clone())
            .with_dependencies(public_dependencies)
            .with_generated_at(generated_at);

            model.version = node.version.clone();
            model.latest_version = node.latest_version.clone();
            model.deprecation_date = node.deprecation_date;

            publication.insert_public_model(model);
        }

        tracing::debug!(
            project = %project_name,
            public_models = publication.public_models.len(),
            "built publication"
        );

        publication
    }

    /// First public model id already taken by a node, ignoring `replaced`
    fn find_collision(
        &self,
        publication: &PublicationArtifact,
        replaced: &[String],
    ) -> Option<String> {
        publication
            .public_models
            .keys()
            .filter(|id| !replaced.contains(*id))
            .find(|id| self.nodes.contains_key(*id) || self.public_nodes.contains_key(*id))
            .cloned()
    }

    /// Whether `unique_id` is a model this project exports or an imported
    /// public model
    fn is_exported_or_imported(&self, unique_id: &str, project_name: &str) -> bool {
        match self.nodes.get(unique_id) {
            Some(node) => Self::is_exported(node, project_name),
            None => self.public_nodes.contains_key(unique_id),
        }
    }

    fn is_exported(node: &ManifestNode, project_name: &str) -> bool {
        node.resource_type == NodeType::Model
            && node.access == AccessType::Public
            && node.config.enabled
            && node.package_name == project_name
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionedArtifact for Manifest {
    const SCHEMA_VERSION: SchemaVersion = SchemaVersion::MANIFEST;
}

/// A node owned by this project (model, seed, test, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    /// Unique identifier (e.g., "model.my_project.users")
    pub unique_id: String,

    /// Node name (e.g., "users")
    pub name: String,

    pub resource_type: NodeType,

    pub package_name: String,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    /// Alias (output table name)
    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub relation_name: Option<String>,

    #[serde(default)]
    pub config: NodeConfig,

    #[serde(default)]
    pub access: AccessType,

    #[serde(default)]
    pub version: Option<NodeVersion>,

    #[serde(default)]
    pub latest_version: Option<NodeVersion>,

    #[serde(default)]
    pub depends_on: DependsOn,

    /// Fully qualified name
    #[serde(default)]
    pub fqn: Vec<String>,

    #[serde(default)]
    pub deprecation_date: Option<DateTime<Utc>>,
}

impl ManifestNode {
    /// Enabled, protected node with `fqn = [package, name]`
    pub fn new(
        resource_type: NodeType,
        package_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let package_name = package_name.into();
        let name = name.into();

        Self {
            unique_id: format!("{}.{}.{}", resource_type, package_name, name),
            fqn: vec![package_name.clone(), name.clone()],
            name,
            resource_type,
            package_name,
            database: None,
            schema: None,
            alias: None,
            relation_name: None,
            config: NodeConfig::default(),
            access: AccessType::default(),
            version: None,
            latest_version: None,
            depends_on: DependsOn::default(),
            deprecation_date: None,
        }
    }

    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }

    pub fn is_latest_version(&self) -> bool {
        self.version.is_some() && self.version == self.latest_version
    }

    pub fn search_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}.v{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

/// Node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Whether the node is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

/// Dependencies structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependsOn {
    /// Unique_ids of the project's own nodes this node depends on
    #[serde(default)]
    pub nodes: Vec<String>,

    /// Unique_ids of imported public models this node depends on
    #[serde(default)]
    pub public_nodes: Vec<String>,
}

/// A node returned by ref resolution: either one of the project's own
/// nodes or an imported public model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedNode<'a> {
    Manifest(&'a ManifestNode),
    Public(&'a PublicModel),
}

impl<'a> ResolvedNode<'a> {
    pub fn unique_id(&self) -> &'a str {
        match self {
            Self::Manifest(node) => &node.unique_id,
            Self::Public(node) => &node.unique_id,
        }
    }

    pub fn package_name(&self) -> &'a str {
        match self {
            Self::Manifest(node) => &node.package_name,
            Self::Public(node) => &node.package_name,
        }
    }

    pub fn resource_type(&self) -> NodeType {
        match self {
            Self::Manifest(node) => node.resource_type,
            Self::Public(node) => node.resource_type(),
        }
    }

    pub fn access(&self) -> AccessType {
        match self {
            Self::Manifest(node) => node.access,
            Self::Public(node) => node.access(),
        }
    }

    pub fn search_name(&self) -> String {
        match self {
            Self::Manifest(node) => node.search_name(),
            Self::Public(node) => node.search_name(),
        }
    }

    pub fn is_latest_version(&self) -> bool {
        match self {
            Self::Manifest(node) => node.is_latest_version(),
            Self::Public(node) => node.is_latest_version(),
        }
    }

    pub fn depends_on_nodes(&self) -> &'a [String] {
        match self {
            Self::Manifest(node) => &node.depends_on.nodes,
            Self::Public(node) => node.depends_on_nodes(),
        }
    }

    pub fn depends_on_public_nodes(&self) -> &'a [String] {
        match self {
            Self::Manifest(node) => &node.depends_on.public_nodes,
            Self::Public(node) => node.depends_on_public_nodes(),
        }
    }

    pub fn fqn(&self) -> Vec<String> {
        match self {
            Self::Manifest(node) => node.fqn.clone(),
            Self::Public(node) => node.fqn(),
        }
    }

    /// Whether a node in `package_name` may reference this node.
    /// Group membership is not modelled, so private behaves like protected.
    pub fn is_accessible_from(&self, package_name: &str) -> bool {
        match self.access() {
            AccessType::Public => true,
            AccessType::Protected | AccessType::Private => self.package_name() == package_name,
        }
    }
}

/// Manifest errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Publication for project '{0}' is already loaded")]
    DuplicatePublication(String),

    #[error("No publication found for dependency project '{0}'")]
    PublicationNotFound(String),

    #[error("Public model '{0}' collides with an existing node")]
    IdCollision(String),

    #[error("Invalid publication: {0}")]
    InvalidPublication(#[from] PublicationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshrefly_core::ProjectDependency;
    use pretty_assertions::assert_eq;

    fn upstream_publication() -> PublicationArtifact {
        PublicationArtifact::new("marketing")
            .with_public_model(
                PublicModel::new("orders", "marketing", "model.marketing.orders.v1", "orders_v1")
                    .with_version("1")
                    .with_latest_version("2"),
            )
            .with_public_model(
                PublicModel::new("orders", "marketing", "model.marketing.orders.v2", "orders_v2")
                    .with_version("2")
                    .with_latest_version("2"),
            )
            .with_public_model(PublicModel::new(
                "customers",
                "marketing",
                "model.marketing.customers",
                "customers",
            ))
    }

    #[test]
    fn add_and_remove_publication() {
        let mut manifest = Manifest::new();

        let config = manifest.add_publication(upstream_publication()).unwrap();
        assert_eq!(config.public_node_ids().len(), 3);
        assert_eq!(manifest.public_nodes.len(), 3);

        let removed = manifest.remove_publication("marketing").unwrap();
        assert_eq!(removed.project_name(), "marketing");
        assert!(manifest.public_nodes.is_empty());
        assert!(manifest.publications.is_empty());
        assert!(manifest.remove_publication("marketing").is_none());
    }

    #[test]
    fn duplicate_publication_rejected() {
        let mut manifest = Manifest::new();
        manifest.add_publication(upstream_publication()).unwrap();

        let result = manifest.add_publication(upstream_publication());
        assert!(matches!(result, Err(ManifestError::DuplicatePublication(p)) if p == "marketing"));
    }

    #[test]
    fn colliding_ids_rejected() {
        let mut manifest = Manifest::new();
        manifest.add_node(ManifestNode::new(NodeType::Model, "marketing", "customers"));

        let result = manifest.add_publication(upstream_publication());
        assert!(matches!(
            result,
            Err(ManifestError::IdCollision(id)) if id == "model.marketing.customers"
        ));
        assert!(manifest.public_nodes.is_empty());
    }

    #[test]
    fn replace_publication_swaps_models() {
        let mut manifest = Manifest::new();
        manifest.add_publication(upstream_publication()).unwrap();

        let republished = PublicationArtifact::new("marketing").with_public_model(PublicModel::new(
            "leads",
            "marketing",
            "model.marketing.leads",
            "leads",
        ));
        manifest.replace_publication(republished).unwrap();

        assert_eq!(manifest.publications.len(), 1);
        assert_eq!(
            manifest.public_nodes.keys().collect::<Vec<_>>(),
            vec!["model.marketing.leads"]
        );
    }

    #[test]
    fn load_requires_declared_publications() {
        let mut deps = ProjectDependencies::default();
        deps.projects.push(ProjectDependency::new("marketing"));
        deps.projects.push(ProjectDependency::new("finance"));

        let mut manifest = Manifest::new();
        let result = manifest.load_publications(&deps, vec![upstream_publication()]);
        assert!(matches!(result, Err(ManifestError::PublicationNotFound(p)) if p == "finance"));

        // A failed load imports nothing
        assert!(manifest.publications.is_empty());
        assert!(manifest.public_nodes.is_empty());
    }

    #[test]
    fn load_keeps_already_loaded_publications() {
        let mut deps = ProjectDependencies::default();
        deps.projects.push(ProjectDependency::new("marketing"));

        let mut manifest = Manifest::new();
        manifest.add_publication(upstream_publication()).unwrap();

        let republished = PublicationArtifact::new("marketing").with_public_model(PublicModel::new(
            "leads",
            "marketing",
            "model.marketing.leads",
            "leads",
        ));
        manifest.load_publications(&deps, vec![republished]).unwrap();

        assert_eq!(manifest.publications.len(), 1);
        assert_eq!(manifest.public_nodes.len(), 3);
        assert!(manifest.get_public_node("model.marketing.leads").is_none());
    }

    #[test]
    fn build_publication_skips_unexported_dependencies() {
        let mut manifest = Manifest::new();

        let mut disabled = ManifestNode::new(NodeType::Model, "finance", "upstream");
        disabled.access = AccessType::Public;
        disabled.config.enabled = false;
        manifest.add_node(disabled);

        let mut foreign = ManifestNode::new(NodeType::Model, "vendor", "rates");
        foreign.access = AccessType::Public;
        manifest.add_node(foreign);

        let mut down = ManifestNode::new(NodeType::Model, "finance", "down");
        down.access = AccessType::Public;
        down.depends_on.nodes = vec![
            "model.finance.upstream".to_string(),
            "model.vendor.rates".to_string(),
        ];
        manifest.add_node(down);

        let publication =
            manifest.build_publication("finance", PublicationMetadata::new(), Vec::new());

        assert_eq!(
            publication.public_models.keys().collect::<Vec<_>>(),
            vec!["model.finance.down"]
        );
        assert!(publication.public_models["model.finance.down"]
            .public_node_dependencies
            .is_empty());
    }

    #[test]
    fn load_skips_undeclared_publications() {
        let mut deps = ProjectDependencies::default();
        deps.projects.push(ProjectDependency::new("marketing"));
        deps.projects.push(ProjectDependency::new("marketing"));

        let mut manifest = Manifest::new();
        manifest
            .load_publications(
                &deps,
                vec![upstream_publication(), PublicationArtifact::new("unrelated")],
            )
            .unwrap();

        assert_eq!(manifest.publications.len(), 1);
        assert!(manifest.get_publication("unrelated").is_none());
    }

    #[test]
    fn unversioned_ref_resolves_latest() {
        let mut manifest = Manifest::new();
        manifest.add_publication(upstream_publication()).unwrap();

        let resolved = manifest.resolve_ref("orders", None, None).unwrap();
        assert_eq!(resolved.unique_id(), "model.marketing.orders.v2");
        assert_eq!(resolved.resource_type(), NodeType::PublicModel);
        assert!(resolved.is_latest_version());

        let v1 = NodeVersion::from("1");
        let resolved = manifest.resolve_ref("orders", Some("marketing"), Some(&v1)).unwrap();
        assert_eq!(resolved.unique_id(), "model.marketing.orders.v1");
        assert_eq!(resolved.search_name(), "orders.v1");

        assert!(manifest.resolve_ref("orders", Some("finance"), None).is_none());
        assert!(manifest.resolve_ref("missing", None, None).is_none());
    }

    #[test]
    fn own_nodes_win_over_public_nodes() {
        let mut manifest = Manifest::new();
        manifest.add_publication(upstream_publication()).unwrap();
        manifest.add_node(ManifestNode::new(NodeType::Model, "finance", "customers"));

        let resolved = manifest.resolve_ref("customers", None, None).unwrap();
        assert!(matches!(resolved, ResolvedNode::Manifest(_)));

        let resolved = manifest.resolve_ref("customers", Some("marketing"), None).unwrap();
        assert!(matches!(resolved, ResolvedNode::Public(_)));
    }

    #[test]
    fn public_nodes_resolve_as_leaves() {
        let mut manifest = Manifest::new();
        let mut publication = upstream_publication();
        publication.insert_public_model(
            PublicModel::new("revenue", "marketing", "model.marketing.revenue", "revenue")
                .with_dependencies(vec!["model.marketing.customers".to_string()]),
        );
        manifest.add_publication(publication).unwrap();

        let resolved = manifest.resolve_ref("revenue", None, None).unwrap();
        assert!(resolved.depends_on_nodes().is_empty());
        assert!(resolved.depends_on_public_nodes().is_empty());
        assert_eq!(resolved.fqn(), vec!["marketing", "revenue"]);
        assert!(resolved.is_accessible_from("finance"));
    }

    #[test]
    fn protected_nodes_only_accessible_in_package() {
        let mut manifest = Manifest::new();
        manifest.add_node(ManifestNode::new(NodeType::Model, "finance", "ledger"));

        let resolved = manifest.resolve_ref("ledger", None, None).unwrap();
        assert!(resolved.is_accessible_from("finance"));
        assert!(!resolved.is_accessible_from("marketing"));
    }

    #[test]
    fn disabled_and_unrefable_nodes_not_resolved() {
        let mut manifest = Manifest::new();

        let mut disabled = ManifestNode::new(NodeType::Model, "finance", "ledger");
        disabled.config.enabled = false;
        manifest.add_node(disabled);
        manifest.add_node(ManifestNode::new(NodeType::Test, "finance", "not_null_ledger"));

        assert!(manifest.resolve_ref("ledger", None, None).is_none());
        assert!(manifest.resolve_ref("not_null_ledger", None, None).is_none());
    }
}
