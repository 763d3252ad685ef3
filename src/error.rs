// ABOUTME: Application-wide error types for chartpilot.
// ABOUTME: Config and CLI failures, wrapping deployment errors from the core.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown package: {0}")]
    UnknownPackage(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("refusing to run without --yes: {0}")]
    NotConfirmed(&'static str),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
