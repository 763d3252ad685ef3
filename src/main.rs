// ABOUTME: Entry point for the chartpilot CLI application.
// ABOUTME: Parses arguments, wires ctrl-c to cancellation, and dispatches to command handlers.

mod cli;
mod commands;

use chartpilot::config::Config;
use chartpilot::error::Result;
use chartpilot::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands};
use commands::Clients;
use std::env;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins unless --verbose asks for everything
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    if let Err(e) = run(cli, Output::new(mode), &cancel).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output, cancel: &CancellationToken) -> Result<()> {
    let clients = Clients::new(cli.kube_context.as_deref(), output.mode());

    match cli.command {
        Commands::Deploy {
            target,
            image,
            force_update,
            dry_run,
            timeout,
        } => {
            let config = Config::discover(&env::current_dir()?)?;
            let request = commands::DeployRequest {
                target,
                image,
                force_update,
                dry_run,
                timeout,
            };
            commands::deploy(&config, &clients, request, cancel, output).await
        }
        Commands::Validate { target } => {
            let config = Config::discover(&env::current_dir()?)?;
            commands::validate(&config, &clients, target, output).await
        }
        Commands::Template { target, image } => {
            let config = Config::discover(&env::current_dir()?)?;
            commands::template(&config, &clients, target, image, output).await
        }
        Commands::Rollback {
            release,
            revision,
            namespace,
        } => commands::rollback(&clients, &release, &namespace, revision, cancel, output).await,
        Commands::History { release, namespace } => {
            commands::history(&clients, &release, &namespace, output).await
        }
        Commands::Status { release, namespace } => {
            commands::status(&clients, &release, &namespace, output).await
        }
        Commands::List { namespace } => commands::list(&clients, namespace.as_deref(), output).await,
        Commands::EmergencyCleanup { yes } => {
            commands::emergency_cleanup(&clients, yes, cancel, output).await
        }
    }
}
