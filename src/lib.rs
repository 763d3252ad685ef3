// ABOUTME: Library root for chartpilot - exposes the orchestrator and its ports.
// ABOUTME: The main binary is in main.rs.

pub mod cluster;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod output;
pub mod release;
pub mod types;
