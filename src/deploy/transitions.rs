// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::path::Path;

use crate::cluster::ClusterProbe;
use crate::diagnostics::Advisory;
use crate::release::ReleaseOps;
use crate::types::Environment;

use super::Deployment;
use super::deployment::{DeployPlan, ValuesFile};
use super::error::{DeployError, ValidationError};
use super::lock::{LockCheck, LockCoordinator, LockWait};
use super::naming::release_name;
use super::state::{Cleared, Initialized, Validated};
use super::strategy::Archetype;

// =============================================================================
// Initialized -> Validated
// =============================================================================

impl Deployment<Initialized> {
    /// Check preconditions and resolve the plan for this call.
    ///
    /// Hard failures abort before any attempt. Presence checks for secrets
    /// and volume claims only run when a probe is supplied and never fail.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Validation` describing the first unmet precondition.
    pub async fn validate(
        mut self,
        probe: Option<&dyn ClusterProbe>,
    ) -> Result<Deployment<Validated>, DeployError> {
        let plan = self
            .resolve_plan()
            .map_err(|e| DeployError::validation(&self.package.name, e))?;

        if let Some(probe) = probe {
            self.check_dependencies(probe, &plan.namespace).await;
        }

        tracing::debug!(
            package = %self.package.name,
            release = %plan.release,
            namespace = %plan.namespace,
            timeout_secs = plan.timeout.as_secs(),
            "deployment validated"
        );
        Ok(self.transition(Validated { plan }))
    }

    fn resolve_plan(&mut self) -> Result<DeployPlan, ValidationError> {
        let package = &self.package;
        let options = &self.options;

        if package.path.as_os_str().is_empty() {
            return Err(ValidationError::MissingPath);
        }

        if package.supports_image_override
            && options.image_repository.as_deref().is_none_or(str::is_empty)
        {
            return Err(ValidationError::MissingImageRepository);
        }

        let namespace = options.namespace_for(package);
        if package.multi_namespace {
            if package.namespaces.is_empty() {
                return Err(ValidationError::NoTargetNamespaces);
            }
            if !package.namespaces.contains(&namespace) {
                return Err(ValidationError::NotATargetNamespace(namespace));
            }
        }

        let release = release_name(package, &namespace, options.namespace_prefix.as_deref())?;

        let profile = &package.profile;
        if profile.archetype == Archetype::StatefulStore
            && let Some(expected) = &profile.home_namespace
            && *expected != namespace
        {
            return Err(ValidationError::NamespaceMismatch {
                expected: expected.clone(),
                actual: namespace,
            });
        }

        let values = resolve_values_file(&package.path, options.environment)?;
        let timeout = profile.compute_timeout(options.timeout);
        let wait = profile.wait_policy();
        let image = options.image_for(package);

        if values.is_default {
            self.diagnostics.warn(Advisory::default_values_file(format!(
                "no {}.values.yaml for {}, using {}",
                self.options.environment,
                self.package.name,
                values.path.display()
            )));
        }

        Ok(DeployPlan {
            release,
            namespace,
            values,
            timeout,
            wait,
            image,
        })
    }

    async fn check_dependencies(&mut self, probe: &dyn ClusterProbe, namespace: &str) {
        for secret in &self.package.required_secrets {
            match probe.secret_exists(namespace, secret).await {
                Ok(true) => {}
                Ok(false) => self.diagnostics.warn(Advisory::missing_secret(format!(
                    "secret {secret} not found in {namespace}; it may be created by the chart"
                ))),
                Err(e) => self.diagnostics.warn(Advisory::probe_failed(format!(
                    "could not check secret {secret} in {namespace}: {e}"
                ))),
            }
        }

        for claim in &self.package.required_volumes {
            match probe.volume_claim_exists(namespace, claim).await {
                Ok(true) => {}
                Ok(false) => self.diagnostics.warn(Advisory::missing_volume(format!(
                    "volume claim {claim} not found in {namespace}; it may be created by the chart"
                ))),
                Err(e) => self.diagnostics.warn(Advisory::probe_failed(format!(
                    "could not check volume claim {claim} in {namespace}: {e}"
                ))),
            }
        }
    }
}

/// Values file for `environment` inside `chart`.
///
/// Prefers `<chart>/<environment>.values.yaml`, falling back to `<chart>/values.yaml`.
///
/// # Errors
///
/// Returns `ValidationError::MissingValuesFile` when neither exists.
pub fn resolve_values_file(
    chart: &Path,
    environment: Environment,
) -> Result<ValuesFile, ValidationError> {
    let environment_file = chart.join(format!("{environment}.values.yaml"));
    if environment_file.is_file() {
        return Ok(ValuesFile {
            path: environment_file,
            is_default: false,
        });
    }

    let default_file = chart.join("values.yaml");
    if default_file.is_file() {
        return Ok(ValuesFile {
            path: default_file,
            is_default: true,
        });
    }

    Err(ValidationError::MissingValuesFile {
        environment_file,
        default_file,
    })
}

// =============================================================================
// Validated -> Cleared
// =============================================================================

impl Deployment<Validated> {
    /// Remove plain-named legacy releases and resolve stuck lock state.
    ///
    /// Never fails: anything that goes wrong here is recorded as an advisory and
    /// left for the attempt loop to surface. Dry runs skip every mutating step.
    pub async fn clear_conflicts<R: ReleaseOps + ?Sized>(
        mut self,
        port: &R,
        lock_wait: LockWait,
    ) -> Deployment<Cleared> {
        let plan = self.state.plan.clone();

        if self.options.dry_run {
            tracing::info!(
                release = %plan.release,
                "dry run, skipping legacy cleanup and lock recovery"
            );
            return self.transition(Cleared {
                plan,
                lock: LockCheck::Unchecked,
            });
        }

        if self.package.multi_namespace {
            self.remove_legacy_releases(port).await;
        }

        let coordinator = LockCoordinator::new(port, lock_wait);
        let lock = match coordinator
            .check_and_resolve(plan.release.as_str(), &plan.namespace)
            .await
        {
            Ok(check) => {
                match &check {
                    LockCheck::InProgress(pending) => {
                        self.diagnostics.warn(Advisory::pending_operation(format!(
                            "{} in progress on {}, proceeding",
                            pending.operation, plan.release
                        )))
                    }
                    LockCheck::Cleared(pending) => {
                        self.diagnostics.warn(Advisory::pending_operation(format!(
                            "cleared stuck {} on {}",
                            pending.operation, plan.release
                        )))
                    }
                    LockCheck::Clear | LockCheck::Unchecked => {}
                }
                check
            }
            Err(e) => {
                self.diagnostics
                    .warn(Advisory::pending_operation(format!("lock check skipped: {e}")));
                LockCheck::Unchecked
            }
        };

        self.transition(Cleared { plan, lock })
    }

    /// Uninstall a release named after the bare package in every target namespace.
    async fn remove_legacy_releases<R: ReleaseOps + ?Sized>(&mut self, port: &R) {
        let name = &self.package.name;
        for namespace in &self.package.namespaces {
            match port.uninstall(name, namespace).await {
                Ok(()) => tracing::info!(release = %name, %namespace, "removed legacy release"),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(release = %name, %namespace, "no legacy release")
                }
                Err(e) => self.diagnostics.warn(Advisory::legacy_cleanup(format!(
                    "could not remove legacy release {name} in {namespace}: {e}"
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::package::{DeploymentOptions, Package};
    use crate::diagnostics::AdvisoryKind;
    use std::fs;
    use tempfile::TempDir;

    fn chart(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            fs::write(dir.path().join(file), "replicaCount: 1\n").unwrap();
        }
        dir
    }

    #[test]
    fn environment_values_file_preferred() {
        let dir = chart(&["staging.values.yaml", "values.yaml"]);
        let values = resolve_values_file(dir.path(), Environment::Staging).unwrap();
        assert!(!values.is_default);
        assert!(values.path.ends_with("staging.values.yaml"));
    }

    #[test]
    fn falls_back_to_default_values() {
        let dir = chart(&["values.yaml"]);
        let values = resolve_values_file(dir.path(), Environment::Production).unwrap();
        assert!(values.is_default);
        assert!(values.path.ends_with("values.yaml"));
    }

    #[test]
    fn missing_values_is_an_error() {
        let dir = chart(&[]);
        let err = resolve_values_file(dir.path(), Environment::Development).unwrap_err();
        assert!(matches!(err, ValidationError::MissingValuesFile { .. }));
    }

    #[tokio::test]
    async fn default_values_file_is_advisory() {
        let dir = chart(&["values.yaml"]);
        let package = Package::new("api", dir.path());
        let deployment = Deployment::new(package, DeploymentOptions::new(Environment::Staging));

        let validated = deployment.validate(None).await.unwrap();
        assert!(validated.diagnostics().contains(AdvisoryKind::DefaultValuesFile));
        assert_eq!(validated.plan().namespace, "staging");
    }

    #[tokio::test]
    async fn stateful_store_outside_home_namespace_fails() {
        let dir = chart(&["values.yaml"]);
        let package = Package::new("clickhouse", dir.path());
        let options = DeploymentOptions::new(Environment::Production).for_namespace("apps");

        let err = Deployment::new(package, options)
            .validate(None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.validation_error(),
            Some(ValidationError::NamespaceMismatch { expected, .. }) if expected == "databases"
        ));
    }

    #[tokio::test]
    async fn relational_store_has_no_namespace_constraint() {
        let dir = chart(&["values.yaml"]);
        let package = Package::new("postgres", dir.path());
        let options = DeploymentOptions::new(Environment::Production).for_namespace("apps");

        let validated = Deployment::new(package, options).validate(None).await.unwrap();
        assert_eq!(validated.plan().namespace, "apps");
    }
}
