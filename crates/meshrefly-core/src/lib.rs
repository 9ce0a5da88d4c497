//! MeshRefly Core
//!
//! Stable, versioned leaf types shared by every artifact kind.
//! Never rename serialized names - they are part of the artifact format.

pub mod version;
pub mod metadata;
pub mod artifact;
pub mod node;
pub mod config;

pub use version::SchemaVersion;
pub use metadata::ArtifactMetadata;
pub use artifact::{VersionedArtifact, ArtifactError};
pub use node::{NodeType, AccessType, NodeVersion};
pub use config::{ProjectConfig, ProjectDependency, ProjectDependencies, ConfigError};
