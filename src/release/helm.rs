// ABOUTME: ReleaseOps implementation backed by the helm command-line client.
// ABOUTME: Builds helm invocations from directives and parses its JSON output.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::error::ReleaseError;
use super::types::{
    PendingOperation, PendingStatus, ReleaseInfo, ReleaseStatus, Revision, TemplateOptions,
    UpgradeDirective,
};
use super::ReleaseOps;
use crate::types::ReleaseName;

/// Pending operations older than this are considered abandoned.
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Drives the `helm` binary.
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
    kube_context: Option<String>,
    stale_after: Duration,
}

impl Default for HelmCli {
    fn default() -> Self {
        Self::new()
    }
}

impl HelmCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("helm"),
            kube_context: None,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    /// Use a helm binary other than the one on `PATH`.
    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Target a specific kubeconfig context.
    pub fn kube_context(mut self, context: impl Into<String>) -> Self {
        self.kube_context = Some(context.into());
        self
    }

    /// Age after which a pending operation is reported as stuck.
    pub fn stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(ref context) = self.kube_context {
            cmd.arg("--kube-context").arg(context);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    async fn run(&self, operation: &'static str, args: &[String]) -> Result<String, ReleaseError> {
        tracing::debug!(operation, ?args, "running helm");
        let output = self
            .command(args)
            .output()
            .await
            .map_err(ReleaseError::Spawn)?;
        into_stdout(operation, output)
    }

    /// Run a release-scoped command, mapping helm's "not found" to a typed error.
    async fn run_for_release(
        &self,
        operation: &'static str,
        release: &str,
        namespace: &str,
        args: &[String],
    ) -> Result<String, ReleaseError> {
        self.run(operation, args).await.map_err(|e| match e {
            ReleaseError::Command { ref message, .. } if is_release_not_found(message) => {
                ReleaseError::NotFound {
                    name: release.to_string(),
                    namespace: namespace.to_string(),
                }
            }
            other => other,
        })
    }
}

/// Helm's wording for a missing release; other "not found" errors keep their detail.
fn is_release_not_found(message: &str) -> bool {
    message.contains("release: not found")
}

fn into_stdout(operation: &'static str, output: Output) -> Result<String, ReleaseError> {
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = stderr.trim().trim_start_matches("Error: ").to_string();
    Err(ReleaseError::command(operation, message))
}

fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn upgrade_args(release: &ReleaseName, chart: &Path, directive: &UpgradeDirective) -> Vec<String> {
    let mut out = args(["upgrade", "--install", release.as_str()]);
    out.push(chart.display().to_string());
    out.extend(args(["--namespace", &directive.namespace]));
    out.push("-f".to_string());
    out.push(directive.values_file.display().to_string());
    out.push("--timeout".to_string());
    out.push(format!("{}s", directive.timeout.as_secs()));

    let flags = [
        (directive.create_namespace, "--create-namespace"),
        (directive.wait, "--wait"),
        (directive.wait_for_jobs, "--wait-for-jobs"),
        (directive.force, "--force"),
        (directive.atomic, "--atomic"),
        (directive.dry_run, "--dry-run"),
    ];
    out.extend(
        flags
            .iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, flag)| flag.to_string()),
    );

    for set in directive.set_args() {
        out.push("--set".to_string());
        out.push(set);
    }
    out
}

/// `--max 0` lifts helm's default page size of 256 releases.
fn list_args(namespace: Option<&str>) -> Vec<String> {
    let mut out = args(["list", "-o", "json", "--all", "--max", "0"]);
    match namespace {
        Some(ns) => out.extend(args(["--namespace", ns])),
        None => out.push("--all-namespaces".to_string()),
    }
    out
}

#[async_trait]
impl ReleaseOps for HelmCli {
    async fn template(
        &self,
        release: &ReleaseName,
        chart: &Path,
        options: &TemplateOptions,
    ) -> Result<String, ReleaseError> {
        let mut cmd = args(["template", release.as_str()]);
        cmd.push(chart.display().to_string());
        cmd.extend(args(["--namespace", &options.namespace]));
        cmd.push("-f".to_string());
        cmd.push(options.values_file.display().to_string());
        for set in options.set_args() {
            cmd.push("--set".to_string());
            cmd.push(set);
        }
        self.run("template", &cmd).await
    }

    async fn upgrade_install(
        &self,
        release: &ReleaseName,
        chart: &Path,
        directive: &UpgradeDirective,
        cancel: &CancellationToken,
    ) -> Result<(), ReleaseError> {
        let cmd = upgrade_args(release, chart, directive);
        tracing::debug!(args = ?cmd, "running helm upgrade");

        let child = self
            .command(&cmd)
            .kill_on_drop(true)
            .spawn()
            .map_err(ReleaseError::Spawn)?;

        // Dropping the wait future kills the child.
        tokio::select! {
            output = child.wait_with_output() => {
                let output = output.map_err(ReleaseError::Spawn)?;
                into_stdout("upgrade", output).map(|_| ())
            }
            _ = cancel.cancelled() => Err(ReleaseError::Cancelled),
        }
    }

    async fn status(&self, release: &str, namespace: &str) -> Result<ReleaseInfo, ReleaseError> {
        let cmd = args(["status", release, "--namespace", namespace, "-o", "json"]);
        let out = self
            .run_for_release("status", release, namespace, &cmd)
            .await?;
        parse_status(&out)
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<ReleaseInfo>, ReleaseError> {
        let out = self.run("list", &list_args(namespace)).await?;
        parse_list(&out)
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<(), ReleaseError> {
        let cmd = args(["uninstall", release, "--namespace", namespace]);
        self.run_for_release("uninstall", release, namespace, &cmd)
            .await
            .map(|_| ())
    }

    async fn rollback(
        &self,
        release: &str,
        namespace: &str,
        revision: u32,
    ) -> Result<(), ReleaseError> {
        let revision = revision.to_string();
        let cmd = args(["rollback", release, &revision, "--namespace", namespace, "--wait"]);
        self.run_for_release("rollback", release, namespace, &cmd)
            .await
            .map(|_| ())
    }

    async fn history(&self, release: &str, namespace: &str) -> Result<Vec<Revision>, ReleaseError> {
        let cmd = args(["history", release, "--namespace", namespace, "-o", "json"]);
        let out = self
            .run_for_release("history", release, namespace, &cmd)
            .await?;
        parse_history(&out)
    }

    async fn detect_pending_operation(
        &self,
        release: &str,
        namespace: &str,
    ) -> Result<Option<PendingOperation>, ReleaseError> {
        let info = match self.status(release, namespace).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(pending_from_status(&info, self.stale_after, Utc::now()))
    }

    async fn cleanup_stuck_operations(
        &self,
        release: &str,
        namespace: &str,
    ) -> Result<(), ReleaseError> {
        let history = self.history(release, namespace).await?;
        let Some(latest) = history.last() else {
            return Ok(());
        };
        if latest.status.pending_operation().is_none() {
            return Ok(());
        }

        let target = history
            .iter()
            .rev()
            .skip(1)
            .find(|r| r.status.is_rollback_target());

        match target {
            Some(target) => {
                tracing::info!(
                    release,
                    namespace,
                    revision = target.revision,
                    "rolling back stuck release to last good revision"
                );
                self.rollback(release, namespace, target.revision).await
            }
            None => {
                tracing::info!(
                    release,
                    namespace,
                    "uninstalling stuck release with no good revision"
                );
                self.uninstall(release, namespace).await
            }
        }
    }
}

// -----------------------------------------------------------------------------
// JSON output parsing
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct ListEntry {
    name: String,
    namespace: String,
    revision: String,
    #[serde(default)]
    updated: String,
    status: String,
    chart: String,
    #[serde(default)]
    app_version: String,
}

#[derive(Deserialize)]
struct HistoryEntry {
    revision: u32,
    #[serde(default)]
    updated: String,
    status: String,
    chart: String,
    #[serde(default)]
    app_version: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct StatusDoc {
    name: String,
    namespace: String,
    version: u32,
    info: StatusInfo,
    #[serde(default)]
    chart: Option<ChartDoc>,
}

#[derive(Deserialize)]
struct StatusInfo {
    status: String,
    #[serde(default)]
    last_deployed: String,
}

#[derive(Deserialize)]
struct ChartDoc {
    metadata: ChartMetadata,
}

#[derive(Deserialize)]
struct ChartMetadata {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default, rename = "appVersion")]
    app_version: String,
}

fn parse_json<'a, T: Deserialize<'a>>(out: &'a str) -> Result<T, ReleaseError> {
    serde_json::from_str(out).map_err(|e| ReleaseError::Parse(e.to_string()))
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// `helm list` prints Go's default time format: `2024-01-15 10:30:00.123 +0000 UTC`.
fn parse_list_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let (stamp, _zone_name) = s.trim().rsplit_once(' ')?;
    DateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S%.f %z")
        .ok()
        .map(|t| t.with_timezone(&Utc))
        .or_else(|| {
            NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}

fn parse_list(out: &str) -> Result<Vec<ReleaseInfo>, ReleaseError> {
    if out.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<ListEntry> = parse_json(out)?;
    entries
        .into_iter()
        .map(|e| {
            let revision = e
                .revision
                .parse()
                .map_err(|_| ReleaseError::Parse(format!("invalid revision '{}'", e.revision)))?;
            Ok(ReleaseInfo {
                name: e.name,
                namespace: e.namespace,
                revision,
                status: ReleaseStatus::from(e.status.as_str()),
                chart: e.chart,
                app_version: e.app_version,
                updated: parse_list_timestamp(&e.updated),
            })
        })
        .collect()
}

fn parse_history(out: &str) -> Result<Vec<Revision>, ReleaseError> {
    let entries: Vec<HistoryEntry> = parse_json(out)?;
    Ok(entries
        .into_iter()
        .map(|e| Revision {
            revision: e.revision,
            status: ReleaseStatus::from(e.status.as_str()),
            chart: e.chart,
            app_version: e.app_version,
            updated: parse_rfc3339(&e.updated),
            description: Some(e.description).filter(|d| !d.is_empty()),
        })
        .collect())
}

fn parse_status(out: &str) -> Result<ReleaseInfo, ReleaseError> {
    let doc: StatusDoc = parse_json(out)?;
    let (chart, app_version) = match doc.chart {
        Some(c) => (
            format!("{}-{}", c.metadata.name, c.metadata.version),
            c.metadata.app_version,
        ),
        None => (String::new(), String::new()),
    };
    Ok(ReleaseInfo {
        name: doc.name,
        namespace: doc.namespace,
        revision: doc.version,
        status: ReleaseStatus::from(doc.info.status.as_str()),
        chart,
        app_version,
        updated: parse_rfc3339(&doc.info.last_deployed),
    })
}

fn pending_from_status(
    info: &ReleaseInfo,
    stale_after: Duration,
    now: DateTime<Utc>,
) -> Option<PendingOperation> {
    let operation = info.status.pending_operation()?;
    let stuck = info.updated.is_some_and(|started| {
        (now - started)
            .to_std()
            .is_ok_and(|age| age >= stale_after)
    });
    Some(PendingOperation {
        operation,
        status: if stuck {
            PendingStatus::Stuck
        } else {
            PendingStatus::InProgress
        },
        started_at: info.updated,
        owner: None,
    })
}
