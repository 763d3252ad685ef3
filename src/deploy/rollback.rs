// ABOUTME: Recovery operations: revision rollback, history inspection and emergency cleanup.
// ABOUTME: None of these run on the normal deploy path.

use tokio_util::sync::CancellationToken;

use crate::release::{ReleaseOps, Revision};

use super::error::DeployError;
use super::orchestrator::Orchestrator;

/// Outcome of [`Orchestrator::emergency_cleanup_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Releases uninstalled.
    pub processed: usize,
    /// `namespace/release` pairs that could not be uninstalled, with the reason.
    pub failed: Vec<(String, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<R: ReleaseOps> Orchestrator<R> {
    /// Roll a release back to `revision`.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Rollback` naming the release and revision, or
    /// `DeployError::Interrupted` if `cancel` has already fired.
    pub async fn rollback(
        &self,
        cancel: &CancellationToken,
        release: &str,
        namespace: &str,
        revision: u32,
    ) -> Result<(), DeployError> {
        if cancel.is_cancelled() {
            return Err(DeployError::Interrupted);
        }

        tracing::info!(release, namespace, revision, "rolling back");
        tokio::select! {
            _ = cancel.cancelled() => Err(DeployError::Interrupted),
            result = self.port().rollback(release, namespace, revision) => {
                result.map_err(|source| DeployError::Rollback {
                    release: release.to_string(),
                    namespace: namespace.to_string(),
                    revision,
                    source,
                })
            }
        }
    }

    /// Revision history of a release, oldest first.
    pub async fn history(&self, release: &str, namespace: &str) -> Result<Vec<Revision>, DeployError> {
        self.port()
            .history(release, namespace)
            .await
            .map_err(|source| DeployError::History {
                release: release.to_string(),
                namespace: namespace.to_string(),
                source,
            })
    }

    /// Uninstall every release in every namespace.
    ///
    /// Keeps going past individual failures. Stops early, reporting what was
    /// done so far, if `cancel` fires between uninstalls.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::List` if releases cannot be enumerated.
    pub async fn emergency_cleanup_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CleanupReport, DeployError> {
        let releases = self.list(None).await?;
        tracing::warn!(count = releases.len(), "emergency cleanup: uninstalling every release");

        let mut report = CleanupReport::default();
        for release in releases {
            if cancel.is_cancelled() {
                tracing::warn!(processed = report.processed, "emergency cleanup interrupted");
                break;
            }
            match self.port().uninstall(&release.name, &release.namespace).await {
                Ok(()) => {
                    tracing::info!(release = %release.name, namespace = %release.namespace, "uninstalled");
                    report.processed += 1;
                }
                Err(e) => {
                    tracing::error!(
                        release = %release.name,
                        namespace = %release.namespace,
                        error = %e,
                        "uninstall failed"
                    );
                    report
                        .failed
                        .push((format!("{}/{}", release.namespace, release.name), e.to_string()));
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            failed = report.failed.len(),
            "emergency cleanup finished"
        );
        Ok(report)
    }
}

/// One line per revision: number, status, chart, timestamp and description.
pub fn format_history(revisions: &[Revision]) -> String {
    revisions
        .iter()
        .map(|rev| {
            let updated = rev
                .updated
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            let mut line = format!(
                "Revision {}: {} | {} | {}",
                rev.revision, rev.status, rev.chart, updated
            );
            if let Some(description) = rev.description.as_deref().filter(|d| !d.is_empty()) {
                line.push_str(" | ");
                line.push_str(description);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseStatus;
    use chrono::{TimeZone, Utc};

    fn revision(number: u32, status: ReleaseStatus, description: Option<&str>) -> Revision {
        Revision {
            revision: number,
            status,
            chart: "api-1.2.0".to_string(),
            app_version: "1.2.0".to_string(),
            updated: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single(),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn formats_one_line_per_revision() {
        let history = vec![
            revision(1, ReleaseStatus::Superseded, Some("Install complete")),
            revision(2, ReleaseStatus::Deployed, None),
        ];

        let text = format_history(&history);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Revision 1: superseded | api-1.2.0 | 2024-03-01T12:00:00+00:00 | Install complete"
        );
        assert_eq!(
            lines[1],
            "Revision 2: deployed | api-1.2.0 | 2024-03-01T12:00:00+00:00"
        );
    }

    #[test]
    fn empty_history_formats_to_nothing() {
        assert_eq!(format_history(&[]), "");
    }
}
