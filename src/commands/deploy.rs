// ABOUTME: Deploy command implementation.
// ABOUTME: Resolves package and options from config, then runs one deployment per target namespace.

use std::time::Duration;

use chartpilot::config::Config;
use chartpilot::deploy::{DeployReport, DeploymentOptions};
use chartpilot::error::Result;
use chartpilot::output::Output;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::Clients;
use crate::cli::{ImageArgs, TargetArgs};

pub struct DeployRequest {
    pub target: TargetArgs,
    pub image: ImageArgs,
    pub force_update: bool,
    pub dry_run: bool,
    pub timeout: Option<Duration>,
}

/// Options from the environment's config section, overridden by command-line flags.
pub(super) fn deployment_options(
    config: &Config,
    target: &TargetArgs,
    image: Option<&ImageArgs>,
) -> Result<DeploymentOptions> {
    let mut options = config.options_for(target.env)?;
    options.namespace = target.namespace.clone();

    if let Some(image) = image {
        if image.image_repository.is_some() {
            options.image_repository = image.image_repository.clone();
        }
        options.image_tag = image.image_tag.clone();
    }
    Ok(options)
}

/// Deploy a package.
///
/// A multi-namespace package deployed without `--namespace` goes to each of
/// its namespaces in turn, stopping at the first failure.
pub async fn deploy(
    config: &Config,
    clients: &Clients,
    request: DeployRequest,
    cancel: &CancellationToken,
    mut output: Output,
) -> Result<()> {
    let package = config.package(&request.target.package)?;
    let mut options = deployment_options(config, &request.target, Some(&request.image))?;
    options.force_update = request.force_update;
    options.dry_run = request.dry_run;
    options.timeout = request.timeout;

    let runs: Vec<DeploymentOptions> = if package.multi_namespace && options.namespace.is_none() {
        package
            .namespaces
            .iter()
            .map(|ns| options.for_namespace(ns))
            .collect()
    } else {
        vec![options]
    };

    output.start_timer();
    let verb = if request.dry_run { "Dry-running" } else { "Deploying" };
    output.progress(&format!(
        "{verb} {} ({}) to {} namespace(s)",
        package.name,
        request.target.env,
        runs.len()
    ));

    for options in &runs {
        let namespace = options.namespace_for(&package);
        output.progress(&format!("  → {namespace}..."));

        let report = clients
            .orchestrator
            .deploy(cancel, &package, options)
            .await?;
        print_report(&output, &report);
    }

    output.success("Deployment complete!");
    Ok(())
}

fn print_report(output: &Output, report: &DeployReport) {
    for advisory in &report.advisories {
        output.warning(&advisory.message);
    }

    let text = format!(
        "  ✓ {} in {} ({} attempt(s), timeout {}s)",
        report.release,
        report.namespace,
        report.attempts,
        report.timeout.as_secs()
    );
    output.data(
        &text,
        &json!({
            "release": report.release.as_str(),
            "namespace": report.namespace,
            "attempts": report.attempts,
            "duration_ms": report.duration.as_millis() as u64,
            "timeout_secs": report.timeout.as_secs(),
            "dry_run": report.dry_run,
        }),
    );
}
