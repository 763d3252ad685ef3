// ABOUTME: Deployment orchestrator: drives a package through validation, conflict checks and attempts.
// ABOUTME: Owns the bounded retry loop and emits the structured monitoring events.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::cluster::ClusterProbe;
use crate::events::{DeployEvent, EventKind, EventSink, TracingSink};
use crate::release::{ReleaseError, ReleaseInfo, ReleaseOps, TemplateOptions, UpgradeDirective};

use super::classify::{Classifier, ErrorKind, PhraseClassifier};
use super::deployment::{DeployPlan, DeployReport, Deployment};
use super::error::{AttemptFailure, DeployError};
use super::lock::{LockCoordinator, LockError, LockWait};
use super::package::{DeploymentOptions, Package};
use super::state::{Cleared, Completed};

/// Bounds on the attempt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Successful calls slower than this emit a slow-deployment event.
    pub slow_threshold: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            slow_threshold: Duration::from_secs(5 * 60),
        }
    }
}

/// How one attempt ended, before classification.
enum AttemptError {
    /// The attempt's window expired.
    TimedOut,
    /// The caller cancelled the whole call.
    Cancelled,
    Release(ReleaseError),
}

/// Deploys packages through a [`ReleaseOps`] port.
///
/// Holds no mutable state: concurrent `deploy` calls for different packages
/// are independent.
pub struct Orchestrator<R> {
    port: R,
    classifier: Box<dyn Classifier>,
    events: Arc<dyn EventSink>,
    probe: Option<Arc<dyn ClusterProbe>>,
    lock_wait: LockWait,
    retry: RetryPolicy,
}

impl<R: ReleaseOps> Orchestrator<R> {
    pub fn new(port: R) -> Self {
        Self {
            port,
            classifier: Box::new(PhraseClassifier),
            events: Arc::new(TracingSink),
            probe: None,
            lock_wait: LockWait::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Enable advisory secret and volume checks.
    pub fn with_probe(mut self, probe: Arc<dyn ClusterProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn with_lock_wait(mut self, lock_wait: LockWait) -> Self {
        self.lock_wait = lock_wait;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn port(&self) -> &R {
        &self.port
    }

    pub(crate) fn emit(&self, event: DeployEvent) {
        self.events.emit(event);
    }

    /// Deploy one package.
    ///
    /// Validates, clears conflicts, then makes up to `max_attempts` attempts.
    /// Window expiry and non-retriable failures end the call immediately.
    ///
    /// # Errors
    ///
    /// - `DeployError::Validation` if a precondition fails (no attempt is made)
    /// - `DeployError::Failed` with the last attempt's failure and the attempt count
    /// - `DeployError::Cancelled` if `cancel` fires before the call completes
    pub async fn deploy(
        &self,
        cancel: &CancellationToken,
        package: &Package,
        options: &DeploymentOptions,
    ) -> Result<DeployReport, DeployError> {
        let started = Instant::now();
        let span = tracing::info_span!("deploy", package = %package.name);

        async {
            let deployment = Deployment::new(package.clone(), options.clone())
                .validate(self.probe.as_deref())
                .await?
                .clear_conflicts(&self.port, self.lock_wait)
                .await;

            let completed = self.attempt_loop(cancel, deployment, started).await?;
            Ok::<_, DeployError>(completed.finish())
        }
        .instrument(span)
        .await
    }

    async fn attempt_loop(
        &self,
        cancel: &CancellationToken,
        deployment: Deployment<Cleared>,
        started: Instant,
    ) -> Result<Deployment<Completed>, DeployError> {
        let package = deployment.package().name.clone();
        let plan = deployment.plan().clone();
        let lock = LockCoordinator::new(&self.port, self.lock_wait);
        let cancelled = |attempts| DeployError::Cancelled {
            package: package.clone(),
            attempts,
        };

        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(cancelled(attempt));
            }
            attempt += 1;

            let directive = plan.directive(deployment.options());
            let outcome = self
                .run_attempt(cancel, &deployment.package().path, &plan, &directive)
                .instrument(tracing::info_span!("attempt", attempt))
                .await;

            let err = match outcome {
                Ok(()) => {
                    let duration = started.elapsed();
                    self.record_success(&package, &plan, attempt, duration);
                    let report = DeployReport {
                        package: package.clone(),
                        release: plan.release.clone(),
                        namespace: plan.namespace.clone(),
                        attempts: attempt,
                        duration,
                        timeout: plan.timeout,
                        wait: plan.wait,
                        dry_run: deployment.options().dry_run,
                        lock: deployment.lock_check().clone(),
                        advisories: deployment.diagnostics().advisories().to_vec(),
                    };
                    return Ok(deployment.transition(Completed { report }));
                }
                Err(AttemptError::Cancelled) => return Err(cancelled(attempt)),
                Err(AttemptError::TimedOut) => {
                    self.record_failure(&package, &plan, attempt, ErrorKind::Timeout, false);
                    return Err(DeployError::Failed {
                        package: package.clone(),
                        attempts: attempt,
                        source: AttemptFailure::TimedOut(plan.timeout),
                    });
                }
                Err(AttemptError::Release(err)) => err,
            };

            let classification = self.classifier.classify(&err.to_string());
            let kind = classification.kind;
            let retriable = classification.is_retriable();
            tracing::warn!(attempt, error_type = %kind, retriable, error = %err, "attempt failed");
            self.record_failure(&package, &plan, attempt, kind, retriable);

            let last = !retriable || attempt >= self.retry.max_attempts;

            if kind == ErrorKind::LockConflict {
                self.emit(
                    DeployEvent::new(EventKind::LockDetected)
                        .field("package", package.as_str())
                        .field("release", plan.release.as_str())
                        .field("namespace", plan.namespace.as_str())
                        .field("attempt", attempt)
                        .field("error_type", kind.as_str())
                        .field("alert_level", kind.alert_level(attempt).as_str()),
                );
            }

            if last {
                return Err(DeployError::Failed {
                    package: package.clone(),
                    attempts: attempt,
                    source: AttemptFailure::Release { kind, source: err },
                });
            }

            if kind == ErrorKind::LockConflict {
                match lock
                    .wait_for_release(plan.release.as_str(), &plan.namespace, cancel)
                    .await
                {
                    Ok(waited) => tracing::info!(waited_ms = waited.as_millis() as u64, "release lock freed"),
                    Err(LockError::Cancelled) => return Err(cancelled(attempt)),
                    Err(e) => tracing::warn!(error = %e, "retrying while release is still locked"),
                }
            }

            let delay = kind.retry_delay(attempt);
            self.emit(
                DeployEvent::new(EventKind::RetryAttempt)
                    .field("package", package.as_str())
                    .field("namespace", plan.namespace.as_str())
                    .field("attempt", attempt)
                    .field("next_attempt", attempt + 1)
                    .field("delay_secs", delay.as_secs())
                    .field("error_type", kind.as_str())
                    .field("alert_level", kind.alert_level(attempt).as_str()),
            );
            tracing::info!(delay_secs = delay.as_secs(), "backing off before next attempt");

            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(attempt)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One upgrade-install bounded by the plan's window.
    async fn run_attempt(
        &self,
        cancel: &CancellationToken,
        chart: &Path,
        plan: &DeployPlan,
        directive: &UpgradeDirective,
    ) -> Result<(), AttemptError> {
        let window = cancel.child_token();
        let call = self
            .port
            .upgrade_install(&plan.release, chart, directive, &window);

        tokio::select! {
            _ = cancel.cancelled() => {
                window.cancel();
                Err(AttemptError::Cancelled)
            }
            result = tokio::time::timeout(plan.timeout, call) => match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) if cancel.is_cancelled() => Err(AttemptError::Cancelled),
                Ok(Err(e)) => Err(AttemptError::Release(e)),
                Err(_) => {
                    window.cancel();
                    tracing::error!(timeout_secs = plan.timeout.as_secs(), "attempt window expired");
                    Err(AttemptError::TimedOut)
                }
            },
        }
    }

    fn record_success(&self, package: &str, plan: &DeployPlan, attempts: u32, duration: Duration) {
        let duration_ms = duration.as_millis() as u64;
        tracing::info!(release = %plan.release, attempts, duration_ms, "deployment succeeded");

        self.emit(
            DeployEvent::new(EventKind::DeploymentSuccess)
                .field("package", package)
                .field("release", plan.release.as_str())
                .field("namespace", plan.namespace.as_str())
                .field("attempts", attempts)
                .field("duration_ms", duration_ms)
                .field("timeout_secs", plan.timeout.as_secs())
                .field("wait", plan.wait.wait)
                .field("wait_for_jobs", plan.wait.wait_for_jobs)
                .field("atomic", plan.wait.atomic),
        );

        if duration > self.retry.slow_threshold {
            self.emit(
                DeployEvent::new(EventKind::SlowSuccess)
                    .field("package", package)
                    .field("namespace", plan.namespace.as_str())
                    .field("attempts", attempts)
                    .field("duration_ms", duration_ms)
                    .field("threshold_secs", self.retry.slow_threshold.as_secs()),
            );
        }
    }

    fn record_failure(
        &self,
        package: &str,
        plan: &DeployPlan,
        attempt: u32,
        kind: ErrorKind,
        retriable: bool,
    ) {
        let alert_level = kind.alert_level(attempt);
        self.emit(
            DeployEvent::new(EventKind::DeploymentFailure)
                .field("package", package)
                .field("release", plan.release.as_str())
                .field("namespace", plan.namespace.as_str())
                .field("attempt", attempt)
                .field("error_type", kind.as_str())
                .field("alert_level", alert_level.as_str())
                .field("retriable", retriable),
        );

        if kind.is_critical_failure(attempt) {
            self.emit(
                DeployEvent::new(EventKind::CriticalFailure)
                    .field("package", package)
                    .field("namespace", plan.namespace.as_str())
                    .field("attempt", attempt)
                    .field("error_type", kind.as_str())
                    .field("alert_level", alert_level.as_str()),
            );
        }
    }

    /// Render a package locally with the same overrides a deployment would use.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Validation` for unmet preconditions and
    /// `DeployError::Template` when rendering fails.
    pub async fn template(
        &self,
        package: &Package,
        options: &DeploymentOptions,
    ) -> Result<String, DeployError> {
        let validated = Deployment::new(package.clone(), options.clone())
            .validate(None)
            .await?;
        let plan = validated.plan();
        let directive = plan.directive(options);

        let template = TemplateOptions {
            namespace: plan.namespace.clone(),
            values_file: plan.values.path.clone(),
            image: plan.image.clone(),
            set_values: directive.set_values,
        };

        self.port
            .template(&plan.release, &package.path, &template)
            .await
            .map_err(|source| DeployError::Template {
                package: package.name.clone(),
                source,
            })
    }

    /// A package is valid when it renders.
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::template`].
    pub async fn validate(
        &self,
        package: &Package,
        options: &DeploymentOptions,
    ) -> Result<(), DeployError> {
        self.template(package, options).await?;
        tracing::info!(package = %package.name, "package renders cleanly");
        Ok(())
    }

    /// Current state of a release.
    pub async fn status(&self, release: &str, namespace: &str) -> Result<ReleaseInfo, DeployError> {
        self.port
            .status(release, namespace)
            .await
            .map_err(|source| DeployError::Status {
                release: release.to_string(),
                namespace: namespace.to_string(),
                source,
            })
    }

    /// Releases in one namespace, or everywhere.
    pub async fn list(&self, namespace: Option<&str>) -> Result<Vec<ReleaseInfo>, DeployError> {
        self.port
            .list(namespace)
            .await
            .map_err(|source| DeployError::List { source })
    }
}
