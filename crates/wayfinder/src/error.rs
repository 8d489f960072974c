use std::path::PathBuf;
use wayfinder_lib::NavError;

/// Errors reported by the command line front end
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Nav(#[from] NavError),

    #[error("Failed to load graph {path}: {source}")]
    Graph {
        path: PathBuf,
        #[source]
        source: NavError,
    },

    #[error("Failed to load configuration {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: NavError,
    },

    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse GPX file {path}: {source}")]
    Gpx {
        path: PathBuf,
        #[source]
        source: gpx::errors::GpxError,
    },

    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown destination '{0}'")]
    UnknownDestination(String),

    #[error("The region table is empty")]
    NoRegions,

    #[error("Walk {0} contains no track points")]
    EmptyWalk(PathBuf),
}
