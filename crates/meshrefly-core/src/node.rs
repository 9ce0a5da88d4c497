//! Node kinds, access levels and model versions
//!
//! These are wire-stable: serialized names must never change.

use serde::{Deserialize, Serialize};

/// Kind of a node in a project graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Model,
    Analysis,
    Test,
    Snapshot,
    Operation,
    Seed,
    #[serde(rename = "rpc")]
    RpcCall,
    SqlOperation,
    #[serde(rename = "doc")]
    Documentation,
    Source,
    Macro,
    Exposure,
    Metric,
    Group,
    SemanticModel,
    /// Model imported from another project's publication
    PublicModel,
}

impl NodeType {
    /// Stable string identifier, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Analysis => "analysis",
            Self::Test => "test",
            Self::Snapshot => "snapshot",
            Self::Operation => "operation",
            Self::Seed => "seed",
            Self::RpcCall => "rpc",
            Self::SqlOperation => "sql_operation",
            Self::Documentation => "doc",
            Self::Source => "source",
            Self::Macro => "macro",
            Self::Exposure => "exposure",
            Self::Metric => "metric",
            Self::Group => "group",
            Self::SemanticModel => "semantic_model",
            Self::PublicModel => "public_model",
        }
    }

    /// Whether nodes of this kind can be the target of a `ref()`
    pub fn is_refable(&self) -> bool {
        matches!(
            self,
            Self::Model | Self::Seed | Self::Snapshot | Self::PublicModel
        )
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who may reference a model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Only models in the same group
    Private,

    /// Any model in the same project
    #[default]
    Protected,

    /// Any project, including downstream ones importing a publication
    Public,
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::Protected => write!(f, "protected"),
            Self::Public => write!(f, "public"),
        }
    }
}

/// Version identifier of a model
///
/// Written as either a number or a string. Compared structurally: `2` and
/// `"2"` are different versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeVersion {
    Integer(i64),
    Float(f64),
    String(String),
}

impl std::fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            // Whole floats keep their decimal so 2.0 and 2 stay distinct
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for NodeVersion {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for NodeVersion {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for NodeVersion {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for NodeVersion {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}
