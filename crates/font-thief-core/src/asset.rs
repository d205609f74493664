//! Font assets and their lifecycle.

use std::fmt;
use std::path::PathBuf;

use crate::error::AssetError;

/// Why conversion left an asset as downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The requested output format is not one we can produce.
    UnsupportedFormat,
    /// No decoder is registered for the file's container extension.
    NoDecoder,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedFormat => write!(f, "unsupported output format"),
            SkipReason::NoDecoder => write!(f, "no decoder for this container"),
        }
    }
}

/// `Discovered → Downloading → Downloaded → (Converting → Converted) | Skipped | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Discovered,
    Downloading,
    Downloaded,
    Converting,
    Converted,
    Skipped(SkipReason),
    Failed,
}

impl AssetState {
    fn can_become(self, next: AssetState) -> bool {
        use AssetState::*;
        matches!(
            (self, next),
            (Discovered, Downloading)
                | (Downloading, Downloaded)
                | (Downloading, Failed)
                | (Downloaded, Converting)
                | (Downloaded, Skipped(_))
                | (Converting, Converted)
                | (Converting, Failed)
        )
    }

    /// Terminal for a run with or without a conversion request.
    pub fn is_terminal(self, conversion_requested: bool) -> bool {
        match self {
            AssetState::Converted | AssetState::Skipped(_) | AssetState::Failed => true,
            AssetState::Downloaded => !conversion_requested,
            AssetState::Discovered | AssetState::Downloading | AssetState::Converting => false,
        }
    }
}

/// One discovered font resource. Identity is `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontAsset {
    pub url: String,
    /// Local file name (sanitized, unique within the run).
    pub name: String,
    /// Current file on disk, once there is one.
    pub local_path: Option<PathBuf>,
    state: AssetState,
}

impl FontAsset {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            local_path: None,
            state: AssetState::Discovered,
        }
    }

    pub fn state(&self) -> AssetState {
        self.state
    }

    /// Moves to `next`. Transitions outside the lifecycle are a bug.
    pub fn transition(&mut self, next: AssetState) {
        debug_assert!(
            self.state.can_become(next),
            "invalid asset transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(url = %self.url, from = ?self.state, to = ?next, "asset state");
        self.state = next;
    }
}

/// Terminal outcome of one asset.
#[derive(Debug)]
pub enum AssetOutcome {
    /// Saved as-is; no conversion was requested.
    Downloaded,
    Converted,
    /// Saved as-is; conversion was requested but did not apply.
    Skipped(SkipReason),
    Failed(AssetError),
}

impl AssetOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, AssetOutcome::Failed(_))
    }
}

impl fmt::Display for AssetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetOutcome::Downloaded => write!(f, "downloaded"),
            AssetOutcome::Converted => write!(f, "converted"),
            AssetOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            AssetOutcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// What happened to one asset, as handed back to the caller.
#[derive(Debug)]
pub struct AssetReport {
    pub url: String,
    pub name: String,
    /// Final file, if the asset left one.
    pub path: Option<PathBuf>,
    pub outcome: AssetOutcome,
    /// SHA-256 of `path`, hex.
    pub sha256: Option<String>,
}
