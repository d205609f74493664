//! Run-level and per-asset error types.
//!
//! Run-level errors abort the run after acquired resources are released.
//! Per-asset errors are recovered where they happen: the asset is marked
//! failed and the remaining assets carry on.

use std::path::PathBuf;

use crate::fetch::FetchError;

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Target URL is malformed. Raised before any network or disk activity.
    #[error("not a valid url: {input} ({reason})")]
    Validation { input: String, reason: String },

    /// The page loader could not load the target page.
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// The page loader itself could not be started or driven.
    #[error("page loader: {0:#}")]
    Loader(anyhow::Error),

    /// The destination directory could not be created.
    #[error("cannot create destination directory {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled before it finished.
    #[error("run cancelled")]
    Cancelled,
}

/// Errors that end a single asset's work without affecting the others.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("conversion of {name} failed: {message}")]
    Conversion { name: String, message: String },

    /// The worker handling the asset died before reporting.
    #[error("worker for {name} failed: {message}")]
    Worker { name: String, message: String },
}
