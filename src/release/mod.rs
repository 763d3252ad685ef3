// ABOUTME: Release port: the narrow boundary to the cluster package manager.
// ABOUTME: Defines ReleaseOps, the release data model, and the helm CLI adapter.

mod error;
mod helm;
mod types;

pub use error::ReleaseError;
pub use helm::HelmCli;
pub use types::{
    ImageOverride, OperationType, PendingOperation, PendingStatus, ReleaseInfo, ReleaseStatus,
    Revision, TemplateOptions, UpgradeDirective,
};

use crate::types::ReleaseName;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Operations the orchestrator needs from the package manager.
///
/// Implementations must be safe to share across concurrent deployments; the
/// orchestrator never holds in-process state about releases and always asks the
/// port for the cluster's current view.
#[async_trait]
pub trait ReleaseOps: Send + Sync {
    /// Render a chart locally without touching the cluster.
    async fn template(
        &self,
        release: &ReleaseName,
        chart: &Path,
        options: &TemplateOptions,
    ) -> Result<String, ReleaseError>;

    /// Install the release, or upgrade it if it already exists.
    ///
    /// `cancel` fires when the attempt's window expires or the caller gives up;
    /// implementations should abort the underlying operation when it does.
    async fn upgrade_install(
        &self,
        release: &ReleaseName,
        chart: &Path,
        directive: &UpgradeDirective,
        cancel: &CancellationToken,
    ) -> Result<(), ReleaseError>;

    /// Current state of a release.
    async fn status(&self, release: &str, namespace: &str) -> Result<ReleaseInfo, ReleaseError>;

    /// Releases in a namespace, or in every namespace when `namespace` is `None`.
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<ReleaseInfo>, ReleaseError>;

    /// Remove a release.
    async fn uninstall(&self, release: &str, namespace: &str) -> Result<(), ReleaseError>;

    /// Roll a release back to an earlier revision.
    async fn rollback(
        &self,
        release: &str,
        namespace: &str,
        revision: u32,
    ) -> Result<(), ReleaseError>;

    /// Revision history, oldest first.
    async fn history(&self, release: &str, namespace: &str) -> Result<Vec<Revision>, ReleaseError>;

    /// In-flight install/upgrade/rollback recorded against the release, if any.
    async fn detect_pending_operation(
        &self,
        release: &str,
        namespace: &str,
    ) -> Result<Option<PendingOperation>, ReleaseError>;

    /// Force-clear a stuck pending operation.
    async fn cleanup_stuck_operations(
        &self,
        release: &str,
        namespace: &str,
    ) -> Result<(), ReleaseError>;
}
