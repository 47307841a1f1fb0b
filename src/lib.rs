pub mod cli;
pub mod commands;
pub mod config;
pub mod create;
pub mod error;
pub mod local;
pub mod look;
pub mod remote;
pub mod vcs;
pub mod walk;
pub mod workspace;

pub use error::{Error, Result};

/// Initialize tracing with a default filter if `RUST_LOG` is unset. Logs go
/// to stderr; stdout carries only command output.
pub fn init_tracing() {
    let default_filter = "ghq=warn";
    let filter_layer = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(filter_layer)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
