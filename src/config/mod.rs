// ABOUTME: Configuration types and parsing for chartpilot.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and per-environment defaults.

mod deserialize;
mod env_value;

pub use env_value::EnvValue;

use crate::deploy::{Archetype, DeploymentOptions, Package};
use crate::error::{Error, Result};
use crate::types::Environment;
use deserialize::deserialize_packages;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "chartpilot.yml";
pub const CONFIG_FILENAME_ALT: &str = "chartpilot.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".chartpilot/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_packages")]
    pub packages: NonEmpty<PackageConfig>,

    #[serde(default)]
    pub environments: HashMap<Environment, EnvironmentConfig>,

    /// Stripped from namespaces when naming multi-namespace releases.
    #[serde(default)]
    pub namespace_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageConfig {
    pub name: String,
    pub path: PathBuf,

    #[serde(default)]
    pub namespace: Option<String>,

    /// One or more entries mark the package as multi-namespace.
    #[serde(default)]
    pub namespaces: Vec<String>,

    #[serde(default)]
    pub supports_image_override: bool,

    /// Overrides the archetype from the built-in tables.
    #[serde(default)]
    pub archetype: Option<Archetype>,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub required_secrets: Vec<String>,

    #[serde(default)]
    pub required_volumes: Vec<String>,
}

impl PackageConfig {
    pub fn to_package(&self) -> Package {
        let mut package = Package::new(&self.name, self.path.clone())
            .with_image_override(self.supports_image_override);

        if let Some(ref namespace) = self.namespace {
            package = package.in_namespace(namespace);
        }
        if !self.namespaces.is_empty() {
            package = package.across_namespaces(&self.namespaces);
        }
        if let Some(archetype) = self.archetype {
            package.profile.archetype = archetype;
        }
        if self.timeout.is_some() {
            package.profile.timeout = self.timeout;
        }

        package.required_secrets = self.required_secrets.clone();
        package.required_volumes = self.required_volumes.clone();
        package
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub image_repository: Option<EnvValue>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Look up a package by name.
    pub fn package(&self, name: &str) -> Result<Package> {
        self.packages
            .iter()
            .find(|p| p.name == name)
            .map(PackageConfig::to_package)
            .ok_or_else(|| Error::UnknownPackage(name.to_string()))
    }

    /// Deployment options seeded from the environment's section.
    ///
    /// Resolves `image_repository` from the process environment when it is an
    /// env reference.
    pub fn options_for(&self, environment: Environment) -> Result<DeploymentOptions> {
        let section = self.environments.get(&environment);
        let image_repository = section
            .and_then(|s| s.image_repository.as_ref())
            .map(EnvValue::resolve)
            .transpose()?;

        Ok(DeploymentOptions {
            default_namespace: section.and_then(|s| s.namespace.clone()),
            namespace_prefix: self.namespace_prefix.clone(),
            image_repository,
            ..DeploymentOptions::new(environment)
        })
    }
}
