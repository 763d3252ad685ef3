// ABOUTME: Read-only commands: validate, template, status, list and history.
// ABOUTME: None of these change the cluster.

use chartpilot::config::Config;
use chartpilot::deploy::format_history;
use chartpilot::error::Result;
use chartpilot::output::Output;
use chartpilot::release::ReleaseInfo;

use super::Clients;
use super::deploy::deployment_options;
use crate::cli::{ImageArgs, TargetArgs};

pub async fn validate(
    config: &Config,
    clients: &Clients,
    target: TargetArgs,
    output: Output,
) -> Result<()> {
    let package = config.package(&target.package)?;
    let options = deployment_options(config, &target, None)?;

    clients.orchestrator.validate(&package, &options).await?;
    output.success(&format!("{} renders for {}", package.name, target.env));
    Ok(())
}

pub async fn template(
    config: &Config,
    clients: &Clients,
    target: TargetArgs,
    image: ImageArgs,
    output: Output,
) -> Result<()> {
    let package = config.package(&target.package)?;
    let options = deployment_options(config, &target, Some(&image))?;

    let manifest = clients.orchestrator.template(&package, &options).await?;
    output.data(&manifest, &manifest);
    Ok(())
}

pub async fn status(clients: &Clients, release: &str, namespace: &str, output: Output) -> Result<()> {
    let info = clients.orchestrator.status(release, namespace).await?;
    output.data(&describe(&info), &info);
    Ok(())
}

pub async fn list(clients: &Clients, namespace: Option<&str>, output: Output) -> Result<()> {
    let releases = clients.orchestrator.list(namespace).await?;
    if releases.is_empty() {
        output.progress("No releases found");
    }

    let text = releases
        .iter()
        .map(describe)
        .collect::<Vec<_>>()
        .join("\n");
    output.data(&text, &releases);
    Ok(())
}

pub async fn history(clients: &Clients, release: &str, namespace: &str, output: Output) -> Result<()> {
    let revisions = clients.orchestrator.history(release, namespace).await?;
    output.data(&format_history(&revisions), &revisions);
    Ok(())
}

fn describe(info: &ReleaseInfo) -> String {
    format!(
        "{}/{}: revision {} {} ({})",
        info.namespace, info.name, info.revision, info.status, info.chart
    )
}
