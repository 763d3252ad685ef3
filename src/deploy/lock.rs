// ABOUTME: Lock coordination against the cluster's own release lock state.
// ABOUTME: Detects pending operations, clears stuck ones, and polls until a release frees up.

use snafu::{ResultExt, Snafu};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::release::{PendingOperation, ReleaseError, ReleaseOps};

/// Errors from lock coordination.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LockError {
    #[snafu(display("failed to inspect pending operations on {release}: {source}"))]
    Detect {
        release: String,
        source: ReleaseError,
    },

    #[snafu(display("failed to clear stuck operation on {release}: {source}"))]
    Cleanup {
        release: String,
        source: ReleaseError,
    },

    #[snafu(display("release {release} still locked after {}s", waited.as_secs()))]
    WaitTimeout { release: String, waited: Duration },

    #[snafu(display("lock wait cancelled"))]
    Cancelled,
}

/// What the pre-deployment lock check found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockCheck {
    /// Nothing pending.
    Clear,
    /// A live operation holds the release; the deployment proceeds anyway.
    InProgress(PendingOperation),
    /// A stuck operation was found and cleared.
    Cleared(PendingOperation),
    /// The lock state could not be read or cleared.
    Unchecked,
}

/// Polling bounds for [`LockCoordinator::wait_for_release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockWait {
    pub deadline: Duration,
    pub poll_interval: Duration,
}

impl Default for LockWait {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(120),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Talks to the cluster's release lock state through the release port.
///
/// Holds no in-process lock table: every decision is a fresh query, so separate
/// orchestrator processes see the same picture.
pub struct LockCoordinator<'a, R: ?Sized> {
    port: &'a R,
    wait: LockWait,
}

impl<'a, R: ReleaseOps + ?Sized> LockCoordinator<'a, R> {
    pub fn new(port: &'a R, wait: LockWait) -> Self {
        Self { port, wait }
    }

    /// Inspect the release once before the first attempt and clear it if stuck.
    pub async fn check_and_resolve(
        &self,
        release: &str,
        namespace: &str,
    ) -> Result<LockCheck, LockError> {
        let pending = self
            .port
            .detect_pending_operation(release, namespace)
            .await
            .context(DetectSnafu { release })?;

        let Some(pending) = pending else {
            return Ok(LockCheck::Clear);
        };

        if pending.is_stuck() {
            tracing::warn!(
                release,
                namespace,
                operation = %pending.operation,
                started_at = ?pending.started_at,
                "clearing stuck operation"
            );
            self.port
                .cleanup_stuck_operations(release, namespace)
                .await
                .context(CleanupSnafu { release })?;
            tracing::info!(release, namespace, "stuck operation cleared");
            return Ok(LockCheck::Cleared(pending));
        }

        // Left to the package manager: it fails fast if the conflict is real.
        tracing::warn!(
            release,
            namespace,
            operation = %pending.operation,
            owner = ?pending.owner,
            "operation in progress on release, proceeding"
        );
        Ok(LockCheck::InProgress(pending))
    }

    /// Poll until no pending operation is observed or the deadline passes.
    ///
    /// Returns how long it waited. Detection errors count as "still locked".
    pub async fn wait_for_release(
        &self,
        release: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Duration, LockError> {
        let start = Instant::now();

        loop {
            match self.port.detect_pending_operation(release, namespace).await {
                Ok(None) => return Ok(start.elapsed()),
                Ok(Some(pending)) => {
                    tracing::debug!(release, namespace, status = %pending.status, "release still locked");
                }
                Err(e) => {
                    tracing::debug!(release, namespace, error = %e, "lock poll failed");
                }
            }

            let waited = start.elapsed();
            if waited >= self.wait.deadline {
                return WaitTimeoutSnafu { release, waited }.fail();
            }

            let nap = self.wait.poll_interval.min(self.wait.deadline - waited);
            tokio::select! {
                _ = cancel.cancelled() => return CancelledSnafu.fail(),
                _ = tokio::time::sleep(nap) => {}
            }
        }
    }
}
