// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use chartpilot::types::Environment;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "chartpilot")]
#[command(about = "Deploy Helm charts with retries, lock recovery and per-package timeouts")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print results and events as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Kubernetes context passed to helm and kubectl
    #[arg(long, global = true)]
    pub kube_context: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install or upgrade a package
    Deploy {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        image: ImageArgs,

        /// Force new pods even when the chart is unchanged
        #[arg(long)]
        force_update: bool,

        /// Simulate the upgrade without changing the cluster
        #[arg(long)]
        dry_run: bool,

        /// Per-attempt timeout (e.g. 10m), overriding the package default
        #[arg(long, value_parser = parse_duration)]
        timeout: Option<Duration>,
    },

    /// Check that a package renders for an environment
    Validate {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Render a package locally
    Template {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        image: ImageArgs,
    },

    /// Roll a release back to an earlier revision
    Rollback {
        release: String,

        revision: u32,

        #[arg(short, long)]
        namespace: String,
    },

    /// Show the revision history of a release
    History {
        release: String,

        #[arg(short, long)]
        namespace: String,
    },

    /// Show the current state of a release
    Status {
        release: String,

        #[arg(short, long)]
        namespace: String,
    },

    /// List releases
    List {
        /// Limit to one namespace (default: all namespaces)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Uninstall every release in every namespace
    EmergencyCleanup {
        /// Confirm that every release should be removed
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Package name from chartpilot.yml
    pub package: String,

    /// Target environment
    #[arg(short, long, default_value = "development")]
    pub env: Environment,

    /// Target namespace (default: from package or environment)
    #[arg(short, long)]
    pub namespace: Option<String>,
}

#[derive(Args)]
pub struct ImageArgs {
    /// Registry prefix for image overrides
    #[arg(long)]
    pub image_repository: Option<String>,

    /// Image tag to deploy
    #[arg(long)]
    pub image_tag: Option<String>,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}
