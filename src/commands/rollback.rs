// ABOUTME: Rollback and emergency cleanup command implementations.
// ABOUTME: Recovery paths that change the cluster outside a normal deployment.

use chartpilot::error::{Error, Result};
use chartpilot::output::Output;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::Clients;

/// Roll a release back to a revision.
pub async fn rollback(
    clients: &Clients,
    release: &str,
    namespace: &str,
    revision: u32,
    cancel: &CancellationToken,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!(
        "Rolling back {release} in {namespace} to revision {revision}"
    ));

    clients
        .orchestrator
        .rollback(cancel, release, namespace, revision)
        .await?;

    output.success("Rollback complete!");
    Ok(())
}

/// Uninstall every release. Refuses unless confirmed.
pub async fn emergency_cleanup(
    clients: &Clients,
    confirmed: bool,
    cancel: &CancellationToken,
    mut output: Output,
) -> Result<()> {
    if !confirmed {
        return Err(Error::NotConfirmed("emergency cleanup removes every release"));
    }

    output.start_timer();
    output.progress("Uninstalling every release in every namespace...");
    let report = clients.orchestrator.emergency_cleanup_all(cancel).await?;

    for (release, reason) in &report.failed {
        output.warning(&format!("{release}: {reason}"));
    }
    output.data(
        &format!(
            "Processed {} release(s), {} failed",
            report.processed,
            report.failed.len()
        ),
        &json!({ "processed": report.processed, "failed": report.failed.len() }),
    );

    output.success("Emergency cleanup complete");
    Ok(())
}
