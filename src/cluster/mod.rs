// ABOUTME: Cluster inspection port used by advisory pre-deployment checks.
// ABOUTME: Answers whether secrets and volume claims already exist in a namespace.

mod kubectl;

pub use kubectl::Kubectl;

use async_trait::async_trait;

/// Read-only cluster queries.
#[async_trait]
pub trait ClusterProbe: Send + Sync {
    /// Whether a secret with this name exists in the namespace.
    async fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool, ClusterError>;

    /// Whether a persistent volume claim with this name exists in the namespace.
    async fn volume_claim_exists(&self, namespace: &str, name: &str)
    -> Result<bool, ClusterError>;
}

/// Errors from cluster queries.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("failed to run kubectl: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("cluster query failed: {0}")]
    Query(String),
}
