// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports the orchestrator, package model, classification and lock coordination.

mod classify;
mod deployment;
mod error;
mod lock;
mod naming;
mod orchestrator;
mod package;
mod rollback;
mod state;
mod strategy;
mod transitions;

pub use classify::{AlertLevel, Classification, Classifier, ErrorKind, PhraseClassifier, classify};
pub use deployment::{DeployPlan, DeployReport, Deployment, ValuesFile};
pub use error::{AttemptFailure, DeployError, DeployErrorKind, ValidationError};
pub use lock::{LockCheck, LockCoordinator, LockError, LockWait};
pub use naming::{namespace_suffix, release_name};
pub use orchestrator::{Orchestrator, RetryPolicy};
pub use package::{DeploymentOptions, Package};
pub use rollback::{CleanupReport, format_history};
pub use state::{Cleared, Completed, Initialized, Validated};
pub use strategy::{Archetype, PackageProfile, WaitPolicy, compute_timeout};
pub use transitions::resolve_values_file;
