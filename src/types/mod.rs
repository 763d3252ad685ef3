// ABOUTME: Validated domain types shared across the orchestrator.
// ABOUTME: Release names and target environments.

mod environment;
mod release_name;

pub use environment::{Environment, ParseEnvironmentError};
pub use release_name::{MAX_RELEASE_NAME_LEN, ReleaseName, ReleaseNameError};
