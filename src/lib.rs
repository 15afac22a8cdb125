//! Lodestar - single-instance launcher for the Lodestar workbench.
//!
//! This library provides the bootstrap logic for the `lodestar` binary:
//! parsing the command line against a schema extended by plugins, locating an
//! already-running instance, and forwarding eligible commands to it.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod instance;
pub mod logging;
pub mod plugins;
pub mod product;

/// Library-level error type for Lodestar operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid contributed parameter: {0}")]
    SchemaLoad(String),

    #[error("Error parsing command line: {0}")]
    Parse(#[from] cli::ParseError),

    #[error("Remote instance unreachable: {0}")]
    RemoteConnect(String),

    #[error(transparent)]
    RemoteCall(#[from] instance::RemoteCallError),

    #[error("Error evaluating parameter '{param}': {detail}")]
    Handler { param: String, detail: String },

    #[error("Variables file error: {0}")]
    ConfigFile(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Lodestar operations.
pub type Result<T> = std::result::Result<T, Error>;
