// ABOUTME: Error types for deployment workflows.
// ABOUTME: Hard validation failures, terminal attempt failures, and auxiliary operation errors.

use std::path::PathBuf;
use std::time::Duration;

use super::classify::ErrorKind;
use crate::release::ReleaseError;
use crate::types::ReleaseNameError;

/// A precondition that aborts a deployment before any attempt.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("package has no chart path")]
    MissingPath,

    #[error("package supports image overrides but no image repository was supplied")]
    MissingImageRepository,

    #[error(
        "no values file found: looked for {} and {}",
        .environment_file.display(),
        .default_file.display()
    )]
    MissingValuesFile {
        environment_file: PathBuf,
        default_file: PathBuf,
    },

    #[error("must be deployed to namespace {expected}, not {actual}")]
    NamespaceMismatch { expected: String, actual: String },

    #[error("multi-namespace package has no target namespaces")]
    NoTargetNamespaces,

    #[error("namespace {0} is not one of the package's target namespaces")]
    NotATargetNamespace(String),

    #[error("invalid release name: {0}")]
    ReleaseName(#[from] ReleaseNameError),
}

/// Why the final attempt of a deployment failed.
#[derive(Debug, thiserror::Error)]
pub enum AttemptFailure {
    /// The attempt's own window expired. Never retried.
    #[error("attempt timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("{kind} error: {source}")]
    Release { kind: ErrorKind, source: ReleaseError },
}

impl AttemptFailure {
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            AttemptFailure::TimedOut(_) => ErrorKind::Timeout,
            AttemptFailure::Release { kind, .. } => *kind,
        }
    }
}

/// Errors returned by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("validation failed for {package}: {source}")]
    Validation {
        package: String,
        source: ValidationError,
    },

    #[error("deployment of {package} failed after {attempts} attempt(s): {source}")]
    Failed {
        package: String,
        attempts: u32,
        source: AttemptFailure,
    },

    #[error("deployment of {package} cancelled after {attempts} attempt(s)")]
    Cancelled { package: String, attempts: u32 },

    #[error("failed to render {package}: {source}")]
    Template {
        package: String,
        source: ReleaseError,
    },

    #[error("rollback of {release} in {namespace} to revision {revision} failed: {source}")]
    Rollback {
        release: String,
        namespace: String,
        revision: u32,
        source: ReleaseError,
    },

    #[error("failed to read history of {release} in {namespace}: {source}")]
    History {
        release: String,
        namespace: String,
        source: ReleaseError,
    },

    #[error("failed to read status of {release} in {namespace}: {source}")]
    Status {
        release: String,
        namespace: String,
        source: ReleaseError,
    },

    #[error("failed to list releases: {source}")]
    List { source: ReleaseError },

    #[error("operation cancelled")]
    Interrupted,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Validation,
    Failed,
    Cancelled,
    Template,
    Rollback,
    History,
    Status,
    List,
}

impl DeployError {
    pub(crate) fn validation(package: &str, source: impl Into<ValidationError>) -> Self {
        DeployError::Validation {
            package: package.to_string(),
            source: source.into(),
        }
    }

    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Validation { .. } => DeployErrorKind::Validation,
            DeployError::Failed { .. } => DeployErrorKind::Failed,
            DeployError::Cancelled { .. } | DeployError::Interrupted => DeployErrorKind::Cancelled,
            DeployError::Template { .. } => DeployErrorKind::Template,
            DeployError::Rollback { .. } => DeployErrorKind::Rollback,
            DeployError::History { .. } => DeployErrorKind::History,
            DeployError::Status { .. } => DeployErrorKind::Status,
            DeployError::List { .. } => DeployErrorKind::List,
        }
    }

    /// Attempts made before the deployment ended, when any were made.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            DeployError::Failed { attempts, .. } | DeployError::Cancelled { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }

    /// Classification of the failure that ended the deployment.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            DeployError::Failed { source, .. } => Some(source.error_kind()),
            _ => None,
        }
    }

    /// Validation detail, if this is a validation failure.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            DeployError::Validation { source, .. } => Some(source),
            _ => None,
        }
    }
}
