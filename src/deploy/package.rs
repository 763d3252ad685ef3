// ABOUTME: Package descriptors and per-invocation deployment options.
// ABOUTME: Options derive the target namespace and image override for a package.

use std::path::PathBuf;
use std::time::Duration;

use super::strategy::PackageProfile;
use crate::release::ImageOverride;
use crate::types::Environment;

/// A deployable chart. Immutable for the duration of a deployment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    /// Directory holding the chart and its values files.
    pub path: PathBuf,
    /// Fixed namespace for single-namespace packages.
    pub namespace: Option<String>,
    /// Deployed independently into each of `namespaces`.
    pub multi_namespace: bool,
    pub namespaces: Vec<String>,
    pub supports_image_override: bool,
    pub profile: PackageProfile,
    /// Secrets expected in the namespace; absence is advisory.
    pub required_secrets: Vec<String>,
    /// Volume claims expected in the namespace; absence is advisory.
    pub required_volumes: Vec<String>,
}

impl Package {
    /// A single-namespace package profiled from the static tables.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let profile = PackageProfile::lookup(&name);
        Self {
            name,
            path: path.into(),
            namespace: None,
            multi_namespace: false,
            namespaces: Vec::new(),
            supports_image_override: false,
            profile,
            required_secrets: Vec::new(),
            required_volumes: Vec::new(),
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Mark as multi-namespace, targeting `namespaces`.
    pub fn across_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.multi_namespace = true;
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_image_override(mut self, supported: bool) -> Self {
        self.supports_image_override = supported;
        self
    }

    pub fn with_profile(mut self, profile: PackageProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn requires_secret(mut self, name: impl Into<String>) -> Self {
        self.required_secrets.push(name.into());
        self
    }

    pub fn requires_volume(mut self, name: impl Into<String>) -> Self {
        self.required_volumes.push(name.into());
        self
    }
}

/// Per-invocation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentOptions {
    pub environment: Environment,
    /// Explicit target namespace; beats every other source.
    pub namespace: Option<String>,
    /// Namespace used when neither the caller nor the package names one.
    pub default_namespace: Option<String>,
    /// Shared prefix stripped from namespaces when naming multi-namespace releases.
    pub namespace_prefix: Option<String>,
    /// Registry prefix, e.g. `registry.example.com/platform`.
    pub image_repository: Option<String>,
    /// Tag base requested by the caller.
    pub image_tag: Option<String>,
    pub force_update: bool,
    pub dry_run: bool,
    /// Caller-supplied timeout; always wins over computed defaults.
    pub timeout: Option<Duration>,
}

impl DeploymentOptions {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            ..Default::default()
        }
    }

    /// Copy of these options pinned to one namespace.
    pub fn for_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..self.clone()
        }
    }

    /// Namespace a package deploys into.
    ///
    /// Priority:
    /// 1. Explicit option
    /// 2. Package namespace (first target for multi-namespace packages)
    /// 3. Configured default for the environment
    /// 4. The environment name
    pub fn namespace_for(&self, package: &Package) -> String {
        if let Some(ref ns) = self.namespace {
            return ns.clone();
        }
        let from_package = if package.multi_namespace {
            package.namespaces.first()
        } else {
            package.namespace.as_ref()
        };
        from_package
            .or(self.default_namespace.as_ref())
            .cloned()
            .unwrap_or_else(|| self.environment.as_str().to_string())
    }

    /// Tag to deploy: the caller's tag base, else `<environment>-latest`.
    pub fn image_tag(&self) -> String {
        self.image_tag
            .clone()
            .unwrap_or_else(|| format!("{}-latest", self.environment))
    }

    /// Image override for a package, when one applies.
    ///
    /// Only packages that support overrides get one, and only when the caller
    /// asked for a tag or forced an update.
    pub fn image_for(&self, package: &Package) -> Option<ImageOverride> {
        if !package.supports_image_override {
            return None;
        }
        if self.image_tag.is_none() && !self.force_update {
            return None;
        }
        let prefix = self.image_repository.as_deref()?;
        Some(ImageOverride {
            repository: format!("{}/{}", prefix.trim_end_matches('/'), package.name),
            tag: self.image_tag(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> DeploymentOptions {
        DeploymentOptions::new(Environment::Staging)
    }

    #[test]
    fn namespace_priority() {
        let package = Package::new("api", "charts/api");
        assert_eq!(options().namespace_for(&package), "staging");

        let mut opts = options();
        opts.default_namespace = Some("backend".to_string());
        assert_eq!(opts.namespace_for(&package), "backend");

        let package = package.in_namespace("apis");
        assert_eq!(opts.namespace_for(&package), "apis");

        assert_eq!(opts.for_namespace("manual").namespace_for(&package), "manual");
    }

    #[test]
    fn multi_namespace_defaults_to_first_target() {
        let package = Package::new("edge-proxy", "charts/edge-proxy")
            .across_namespaces(["team-a", "team-b"]);
        assert_eq!(options().namespace_for(&package), "team-a");
    }

    #[test]
    fn image_override_requires_support_and_request() {
        let mut opts = options();
        opts.image_repository = Some("registry.local/platform/".to_string());

        let plain = Package::new("api", "charts/api");
        let overridable = Package::new("api", "charts/api").with_image_override(true);

        assert!(opts.image_for(&overridable).is_none());

        opts.force_update = true;
        assert!(opts.image_for(&plain).is_none());
        let image = opts.image_for(&overridable).unwrap();
        assert_eq!(image.repository, "registry.local/platform/api");
        assert_eq!(image.tag, "staging-latest");

        opts.force_update = false;
        opts.image_tag = Some("v1.4.0".to_string());
        assert_eq!(opts.image_for(&overridable).unwrap().tag, "v1.4.0");
    }
}
