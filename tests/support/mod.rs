// ABOUTME: Test support utilities.
// ABOUTME: Provides a scripted in-memory release port and chart directory helpers.

use async_trait::async_trait;
use chartpilot::release::{
    PendingOperation, ReleaseError, ReleaseInfo, ReleaseOps, Revision, TemplateOptions,
    UpgradeDirective,
};
use chartpilot::types::ReleaseName;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("chartpilot=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A chart directory holding only `values.yaml`.
#[allow(dead_code)]
pub fn chart_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("values.yaml"), "replicaCount: 1\n").unwrap();
    dir
}

/// What one upgrade-install attempt does.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    /// Succeed after taking this long.
    SucceedAfter(Duration),
    /// Fail immediately with this message.
    Fail(String),
    /// Block until cancelled.
    Hang,
}

#[allow(dead_code)]
impl Step {
    pub fn fail(message: &str) -> Self {
        Step::Fail(message.to_string())
    }
}

/// A recorded call to the port.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Template(String),
    Upgrade { release: String, namespace: String },
    Status(String),
    List,
    Uninstall { release: String, namespace: String },
    Rollback { release: String, revision: u32 },
    History(String),
    Detect(String),
    Cleanup(String),
}

#[derive(Default)]
struct Inner {
    steps: VecDeque<Step>,
    pending: VecDeque<Option<PendingOperation>>,
    releases: Vec<ReleaseInfo>,
    failing_uninstalls: HashSet<String>,
    history: Vec<Revision>,
    rollback_error: Option<String>,
    calls: Vec<Call>,
    directives: Vec<UpgradeDirective>,
    attempt_starts: Vec<Instant>,
}

/// Scripted release port. Clones share state so tests can inspect calls
/// after handing a copy to the orchestrator.
#[derive(Clone, Default)]
pub struct FakeReleases {
    inner: Arc<Mutex<Inner>>,
}

#[allow(dead_code)]
impl FakeReleases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script upgrade attempts in order. Unscripted attempts succeed.
    pub fn with_steps(self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.inner.lock().steps.extend(steps);
        self
    }

    /// Script pending-operation answers in order. Unscripted checks find nothing.
    pub fn with_pending(self, answers: impl IntoIterator<Item = Option<PendingOperation>>) -> Self {
        self.inner.lock().pending.extend(answers);
        self
    }

    pub fn with_release(self, info: ReleaseInfo) -> Self {
        self.inner.lock().releases.push(info);
        self
    }

    /// Uninstalling this release always fails.
    pub fn failing_uninstall(self, release: &str) -> Self {
        self.inner.lock().failing_uninstalls.insert(release.to_string());
        self
    }

    pub fn with_history(self, revisions: Vec<Revision>) -> Self {
        self.inner.lock().history = revisions;
        self
    }

    pub fn failing_rollback(self, message: &str) -> Self {
        self.inner.lock().rollback_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub fn upgrades(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Upgrade { .. }))
            .count()
    }

    pub fn directives(&self) -> Vec<UpgradeDirective> {
        self.inner.lock().directives.clone()
    }

    /// Gaps between consecutive attempt starts.
    pub fn attempt_gaps(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .attempt_starts
            .windows(2)
            .map(|w| w[1] - w[0])
            .collect()
    }

    fn record(&self, call: Call) {
        self.inner.lock().calls.push(call);
    }
}

#[allow(dead_code)]
pub fn info(name: &str, namespace: &str) -> ReleaseInfo {
    ReleaseInfo {
        name: name.to_string(),
        namespace: namespace.to_string(),
        revision: 1,
        status: "deployed".into(),
        chart: format!("{name}-1.0.0"),
        app_version: "1.0.0".to_string(),
        updated: None,
    }
}

#[async_trait]
impl ReleaseOps for FakeReleases {
    async fn template(
        &self,
        release: &ReleaseName,
        _chart: &Path,
        options: &TemplateOptions,
    ) -> Result<String, ReleaseError> {
        self.record(Call::Template(release.to_string()));
        let mut manifest = format!("# release: {release}\n# namespace: {}\n", options.namespace);
        for arg in options.set_args() {
            manifest.push_str(&format!("# set: {arg}\n"));
        }
        Ok(manifest)
    }

    async fn upgrade_install(
        &self,
        release: &ReleaseName,
        _chart: &Path,
        directive: &UpgradeDirective,
        cancel: &CancellationToken,
    ) -> Result<(), ReleaseError> {
        let step = {
            let mut inner = self.inner.lock();
            inner.calls.push(Call::Upgrade {
                release: release.to_string(),
                namespace: directive.namespace.clone(),
            });
            inner.directives.push(directive.clone());
            inner.attempt_starts.push(Instant::now());
            inner.steps.pop_front().unwrap_or(Step::Succeed)
        };

        match step {
            Step::Succeed => Ok(()),
            Step::SucceedAfter(duration) => tokio::select! {
                _ = cancel.cancelled() => Err(ReleaseError::Cancelled),
                _ = tokio::time::sleep(duration) => Ok(()),
            },
            Step::Fail(message) => Err(ReleaseError::command("upgrade", message)),
            Step::Hang => {
                cancel.cancelled().await;
                Err(ReleaseError::Cancelled)
            }
        }
    }

    async fn status(&self, release: &str, namespace: &str) -> Result<ReleaseInfo, ReleaseError> {
        self.record(Call::Status(release.to_string()));
        self.inner
            .lock()
            .releases
            .iter()
            .find(|r| r.name == release && r.namespace == namespace)
            .cloned()
            .ok_or_else(|| ReleaseError::NotFound {
                name: release.to_string(),
                namespace: namespace.to_string(),
            })
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<ReleaseInfo>, ReleaseError> {
        self.record(Call::List);
        Ok(self
            .inner
            .lock()
            .releases
            .iter()
            .filter(|r| namespace.is_none_or(|ns| r.namespace == ns))
            .cloned()
            .collect())
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<(), ReleaseError> {
        self.record(Call::Uninstall {
            release: release.to_string(),
            namespace: namespace.to_string(),
        });

        let mut inner = self.inner.lock();
        if inner.failing_uninstalls.contains(release) {
            return Err(ReleaseError::command("uninstall", "connection reset by peer"));
        }
        let before = inner.releases.len();
        inner
            .releases
            .retain(|r| !(r.name == release && r.namespace == namespace));
        if inner.releases.len() == before {
            return Err(ReleaseError::NotFound {
                name: release.to_string(),
                namespace: namespace.to_string(),
            });
        }
        Ok(())
    }

    async fn rollback(
        &self,
        release: &str,
        _namespace: &str,
        revision: u32,
    ) -> Result<(), ReleaseError> {
        self.record(Call::Rollback {
            release: release.to_string(),
            revision,
        });
        match self.inner.lock().rollback_error.clone() {
            Some(message) => Err(ReleaseError::command("rollback", message)),
            None => Ok(()),
        }
    }

    async fn history(&self, release: &str, _namespace: &str) -> Result<Vec<Revision>, ReleaseError> {
        self.record(Call::History(release.to_string()));
        Ok(self.inner.lock().history.clone())
    }

    async fn detect_pending_operation(
        &self,
        release: &str,
        _namespace: &str,
    ) -> Result<Option<PendingOperation>, ReleaseError> {
        self.record(Call::Detect(release.to_string()));
        Ok(self.inner.lock().pending.pop_front().flatten())
    }

    async fn cleanup_stuck_operations(
        &self,
        release: &str,
        _namespace: &str,
    ) -> Result<(), ReleaseError> {
        self.record(Call::Cleanup(release.to_string()));
        Ok(())
    }
}
