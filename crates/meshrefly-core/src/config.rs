//! Project configuration (meshrefly.toml)
//!
//! Declares the project's name, warehouse adapter, quoting settings and the
//! upstream projects whose publications it imports.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One upstream project this project depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDependency {
    /// Upstream project name
    pub name: String,

    /// Fields this version does not know about, kept so they round-trip
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ProjectDependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: HashMap::new(),
        }
    }
}

/// Upstream project dependencies, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDependencies {
    /// Duplicates are kept as declared
    #[serde(default)]
    pub projects: Vec<ProjectDependency>,
}

impl ProjectDependencies {
    /// Load dependencies from a TOML string with `[[projects]]` tables
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let dependencies: ProjectDependencies =
            toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        dependencies.validate()?;
        Ok(dependencies)
    }

    /// Check every dependency names a project
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(index) = self.projects.iter().position(|p| p.name.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "project dependency #{} has an empty name",
                index + 1
            )));
        }

        Ok(())
    }

    /// Dependency names in declaration order
    pub fn project_names(&self) -> Vec<String> {
        self.projects.iter().map(|p| p.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.projects.iter().any(|p| p.name == name)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Name of this project
    pub name: String,

    /// Warehouse adapter type (postgres, snowflake, ...)
    #[serde(default)]
    pub adapter_type: Option<String>,

    /// Quoting settings passed through to artifact headers untouched
    #[serde(default)]
    pub quoting: HashMap<String, serde_json::Value>,

    /// Upstream projects
    #[serde(default)]
    pub dependencies: ProjectDependencies,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            adapter_type: None,
            quoting: HashMap::new(),
            dependencies: ProjectDependencies::default(),
        }
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: ProjectConfig =
            toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config.name.trim().is_empty() {
            return Err(ConfigError::Validation("project name is empty".to_string()));
        }

        config.dependencies.validate()?;
        Ok(config)
    }

    /// Serialize config to a TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid config: {0}")]
    Validation(String),
}
