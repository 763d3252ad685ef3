// ABOUTME: Integration tests for pre-deployment validation.
// ABOUTME: Hard failures abort before any attempt; presence checks only warn.

mod support;

use async_trait::async_trait;
use chartpilot::cluster::{ClusterError, ClusterProbe};
use chartpilot::deploy::{
    DeployErrorKind, DeploymentOptions, Orchestrator, Package, ValidationError,
};
use chartpilot::diagnostics::AdvisoryKind;
use chartpilot::events::MemorySink;
use chartpilot::types::Environment;
use std::sync::Arc;
use support::{Call, FakeReleases};
use tokio_util::sync::CancellationToken;

/// Knows about a fixed set of secrets and no volume claims.
struct FixedProbe {
    secrets: Vec<&'static str>,
}

#[async_trait]
impl ClusterProbe for FixedProbe {
    async fn secret_exists(&self, _namespace: &str, name: &str) -> Result<bool, ClusterError> {
        Ok(self.secrets.contains(&name))
    }

    async fn volume_claim_exists(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<bool, ClusterError> {
        Err(ClusterError::Query("forbidden".to_string()))
    }
}

fn orchestrator(port: &FakeReleases) -> Orchestrator<FakeReleases> {
    Orchestrator::new(port.clone()).with_events(Arc::new(MemorySink::new()))
}

async fn validation_error(
    port: &FakeReleases,
    package: Package,
    options: DeploymentOptions,
) -> ValidationError {
    let err = orchestrator(port)
        .deploy(&CancellationToken::new(), &package, &options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Validation);
    assert_eq!(err.attempts(), None);
    match err {
        chartpilot::deploy::DeployError::Validation { source, .. } => source,
        other => panic!("expected validation error, got {other}"),
    }
}

/// Test: An empty chart path is rejected before touching the cluster.
#[tokio::test]
async fn empty_path_fails_validation() {
    let port = FakeReleases::new();
    let err = validation_error(
        &port,
        Package::new("api", ""),
        DeploymentOptions::new(Environment::Staging),
    )
    .await;

    assert!(matches!(err, ValidationError::MissingPath));
    assert!(port.calls().is_empty());
}

/// Test: Image-overridable packages need an image repository.
#[tokio::test]
async fn missing_image_repository_fails_validation() {
    let chart = support::chart_dir();
    let port = FakeReleases::new();
    let err = validation_error(
        &port,
        Package::new("api", chart.path()).with_image_override(true),
        DeploymentOptions::new(Environment::Staging),
    )
    .await;

    assert!(matches!(err, ValidationError::MissingImageRepository));
    assert_eq!(port.upgrades(), 0);
}

/// Test: A chart without any values file is rejected.
#[tokio::test]
async fn missing_values_file_fails_validation() {
    let chart = tempfile::TempDir::new().unwrap();
    let port = FakeReleases::new();
    let err = validation_error(
        &port,
        Package::new("api", chart.path()),
        DeploymentOptions::new(Environment::Production),
    )
    .await;

    assert!(matches!(err, ValidationError::MissingValuesFile { .. }));
    assert!(err.to_string().contains("production.values.yaml"));
}

/// Test: The columnar store must live in its home namespace.
#[tokio::test]
async fn clickhouse_outside_databases_namespace_fails() {
    let chart = support::chart_dir();
    let port = FakeReleases::new();
    let err = validation_error(
        &port,
        Package::new("clickhouse", chart.path()),
        DeploymentOptions::new(Environment::Production).for_namespace("analytics"),
    )
    .await;

    assert!(matches!(
        err,
        ValidationError::NamespaceMismatch { ref expected, ref actual }
            if expected == "databases" && actual == "analytics"
    ));
}

/// Test: Multi-namespace packages only deploy into their own namespaces.
#[tokio::test]
async fn foreign_namespace_for_multi_namespace_package_fails() {
    let chart = support::chart_dir();
    let port = FakeReleases::new();
    let err = validation_error(
        &port,
        Package::new("edge-proxy", chart.path()).across_namespaces(["team-a", "team-b"]),
        DeploymentOptions::new(Environment::Staging).for_namespace("team-c"),
    )
    .await;

    assert!(matches!(err, ValidationError::NotATargetNamespace(ns) if ns == "team-c"));
}

/// Test: Missing secrets and probe failures only produce advisories.
#[tokio::test]
async fn dependency_checks_are_advisory() {
    let chart = support::chart_dir();
    std::fs::write(chart.path().join("production.values.yaml"), "shards: 2\n").unwrap();
    let port = FakeReleases::new();
    let probe = FixedProbe {
        secrets: vec!["clickhouse-tls"],
    };
    let orchestrator = orchestrator(&port).with_probe(Arc::new(probe));

    let package = Package::new("clickhouse", chart.path())
        .in_namespace("databases")
        .requires_secret("clickhouse-tls")
        .requires_secret("clickhouse-auth")
        .requires_volume("clickhouse-data");

    let report = orchestrator
        .deploy(
            &CancellationToken::new(),
            &package,
            &DeploymentOptions::new(Environment::Production),
        )
        .await
        .unwrap();

    let kinds: Vec<_> = report.advisories.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AdvisoryKind::MissingSecret, AdvisoryKind::ClusterProbe]);
    assert!(report.advisories[0].message.contains("clickhouse-auth"));
    assert_eq!(port.upgrades(), 1);
}

/// Test: Validate succeeds exactly when the package renders.
#[tokio::test]
async fn validate_renders_the_package() {
    let chart = support::chart_dir();
    let port = FakeReleases::new();

    orchestrator(&port)
        .validate(
            &Package::new("api", chart.path()),
            &DeploymentOptions::new(Environment::Staging),
        )
        .await
        .unwrap();

    assert_eq!(port.calls(), vec![Call::Template("api".to_string())]);
}

/// Test: Template output applies the same image override as a deploy.
#[tokio::test]
async fn template_uses_image_override() {
    let chart = support::chart_dir();
    let port = FakeReleases::new();

    let mut options = DeploymentOptions::new(Environment::Staging);
    options.image_repository = Some("registry.local/platform".to_string());
    options.image_tag = Some("v2.3.1".to_string());

    let manifest = orchestrator(&port)
        .template(
            &Package::new("api", chart.path()).with_image_override(true),
            &options,
        )
        .await
        .unwrap();

    assert!(manifest.contains("# set: image.repository=registry.local/platform/api"));
    assert!(manifest.contains("# set: image.tag=v2.3.1"));
    assert!(manifest.contains("# namespace: staging"));
}
