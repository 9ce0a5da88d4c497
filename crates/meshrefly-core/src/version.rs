//! Artifact schema version tags
//!
//! Every artifact carries its schema tag in `metadata.dbt_schema_version`.
//! Tags are STABLE: a breaking change to a document shape requires a new version.

/// Base URL all schema tags are rendered under
pub const SCHEMA_BASE_URL: &str = "https://schemas.getdbt.com/dbt";

/// Schema version tag for one artifact kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaVersion {
    /// Artifact kind (e.g. "publication", "manifest")
    pub name: &'static str,

    /// Schema version of that kind
    pub version: u32,
}

impl SchemaVersion {
    /// Publication artifact schema (publication v1)
    pub const PUBLICATION: SchemaVersion = SchemaVersion::new("publication", 1);

    /// Internal manifest schema (manifest v10)
    pub const MANIFEST: SchemaVersion = SchemaVersion::new("manifest", 10);

    pub const fn new(name: &'static str, version: u32) -> Self {
        Self { name, version }
    }

    /// Full schema URL, the form stored in artifact metadata
    pub fn url(&self) -> String {
        self.to_string()
    }

    /// Check whether a stored tag refers to this exact schema
    pub fn matches(&self, tag: &str) -> bool {
        match parse_tag(tag) {
            Some((name, version)) => name == self.name && version == self.version,
            None => false,
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/v{}.json", SCHEMA_BASE_URL, self.name, self.version)
    }
}

/// Split a schema URL into (kind, version)
///
/// Returns `None` for anything not shaped like `<base>/<kind>/v<N>.json`.
pub fn parse_tag(tag: &str) -> Option<(&str, u32)> {
    let rest = tag.strip_prefix(SCHEMA_BASE_URL)?.strip_prefix('/')?;
    let (name, file) = rest.split_once('/')?;
    let version = file.strip_prefix('v')?.strip_suffix(".json")?.parse().ok()?;

    if name.is_empty() {
        return None;
    }

    Some((name, version))
}
