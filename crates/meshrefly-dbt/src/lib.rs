//! dbt cross-project publications
//!
//! This crate handles:
//! - Publication artifacts and their reduced, embeddable configs
//! - Importing publications into a project's internal manifest
//! - Resolving refs to own and imported public models
//! - Dependency graphs (DAG) for building publications

pub mod publication;
pub mod manifest;
pub mod dag;

pub use publication::{
    PublicModel, PublicationArtifact, PublicationConfig, PublicationError, PublicationMetadata,
};
pub use manifest::{Manifest, ManifestNode, NodeConfig, DependsOn, ResolvedNode, ManifestError};
pub use dag::{DependencyGraph, NodeId};
