// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: Also defines the resolved plan and the final report of a deployment.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::lock::LockCheck;
use super::package::{DeploymentOptions, Package};
use super::state::{Cleared, Completed, Initialized, Validated};
use super::strategy::WaitPolicy;
use crate::diagnostics::{Advisory, Diagnostics};
use crate::release::{ImageOverride, UpgradeDirective};
use crate::types::ReleaseName;

/// Values file chosen for the target environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesFile {
    pub path: PathBuf,
    /// The environment-specific file was missing and the default was used.
    pub is_default: bool,
}

/// Everything resolved once per deployment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPlan {
    pub release: ReleaseName,
    pub namespace: String,
    pub values: ValuesFile,
    /// Fixed for the whole call; every attempt gets the same window.
    pub timeout: Duration,
    pub wait: WaitPolicy,
    pub image: Option<ImageOverride>,
}

impl DeployPlan {
    /// Build a fresh directive for one attempt.
    pub fn directive(&self, options: &DeploymentOptions) -> UpgradeDirective {
        let mut set_values = BTreeMap::new();
        if options.force_update {
            set_values.insert("forceUpdate".to_string(), "true".to_string());
        }

        UpgradeDirective {
            values_file: self.values.path.clone(),
            namespace: self.namespace.clone(),
            create_namespace: true,
            wait: self.wait.wait,
            wait_for_jobs: self.wait.wait_for_jobs,
            timeout: self.timeout,
            force: false,
            atomic: self.wait.atomic,
            dry_run: options.dry_run,
            image: self.image.clone(),
            set_values,
        }
    }
}

/// Summary of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub package: String,
    pub release: ReleaseName,
    pub namespace: String,
    pub attempts: u32,
    pub duration: Duration,
    pub timeout: Duration,
    pub wait: WaitPolicy,
    pub dry_run: bool,
    /// What the pre-deployment lock check found.
    pub lock: LockCheck,
    pub advisories: Vec<Advisory>,
}

/// A deployment in progress, parameterized by its current state.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) package: Package,
    pub(crate) options: DeploymentOptions,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) state: S,
}

impl Deployment<Initialized> {
    pub fn new(package: Package, options: DeploymentOptions) -> Self {
        Deployment {
            package,
            options,
            diagnostics: Diagnostics::default(),
            state: Initialized,
        }
    }
}

impl<S> Deployment<S> {
    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn options(&self) -> &DeploymentOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Move to the next state, keeping package, options and diagnostics.
    pub(crate) fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            package: self.package,
            options: self.options,
            diagnostics: self.diagnostics,
            state,
        }
    }
}

impl Deployment<Validated> {
    pub fn plan(&self) -> &DeployPlan {
        &self.state.plan
    }
}

impl Deployment<Cleared> {
    pub fn plan(&self) -> &DeployPlan {
        &self.state.plan
    }

    pub fn lock_check(&self) -> &LockCheck {
        &self.state.lock
    }
}

impl Deployment<Completed> {
    pub fn finish(self) -> DeployReport {
        self.state.report
    }
}
