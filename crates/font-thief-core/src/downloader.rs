//! Downloads discovered fonts into the run directory.
//!
//! Each asset is fetched with one streaming GET (retried on transient
//! failures). Bodies land in `<name>.part` and are renamed onto `<name>`
//! only when complete.

use std::path::Path;

use crate::asset::{AssetState, FontAsset};
use crate::config::FontThiefConfig;
use crate::context::RunContext;
use crate::control::RunControl;
use crate::error::{AssetError, RunError};
use crate::fetch::{fetch_to_file, FetchError, FetchOptions};
use crate::retry::{run_with_retry, RetryPolicy};

/// Transfer and retry settings shared by every download of a run.
#[derive(Debug, Clone, Default)]
pub struct DownloadSettings {
    pub fetch: FetchOptions,
    pub retry: RetryPolicy,
}

impl DownloadSettings {
    pub fn from_config(cfg: &FontThiefConfig) -> Self {
        Self {
            fetch: FetchOptions::from_config(cfg),
            retry: RetryPolicy::from_config(&cfg.retry_config()),
        }
    }
}

/// Creates the run directory if absent. An existing directory is reused.
pub async fn ensure_destination_directory(ctx: &RunContext) -> Result<&Path, RunError> {
    let dir = ctx.destination_dir();
    let fs_error = |source: std::io::Error| RunError::Filesystem {
        path: dir.to_path_buf(),
        source,
    };
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => {
            tracing::debug!(dir = %dir.display(), "reusing destination directory");
            return Ok(dir);
        }
        Ok(_) => {
            return Err(fs_error(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(fs_error(e)),
    }
    tokio::fs::create_dir_all(dir).await.map_err(fs_error)?;
    tracing::info!(dir = %dir.display(), "created destination directory");
    Ok(dir)
}

/// Downloads `asset` to `ctx.path_for(asset.name)`.
///
/// `Downloading → Downloaded` on success with `local_path` set, or
/// `Downloading → Failed` with no file left behind.
pub async fn fetch_asset(
    asset: &mut FontAsset,
    ctx: &RunContext,
    settings: &DownloadSettings,
    control: &RunControl,
) -> Result<u64, AssetError> {
    asset.transition(AssetState::Downloading);
    let dest = ctx.path_for(&asset.name);
    tracing::debug!(url = %asset.url, dest = %dest.display(), "downloading");

    let result = run_with_retry(&settings.retry, control, |attempt| {
        let url = asset.url.clone();
        let dest = dest.clone();
        let opts = settings.fetch.clone();
        let control = control.clone();
        async move {
            if attempt > 1 {
                tracing::info!(%url, attempt, "retrying download");
            }
            tokio::task::spawn_blocking(move || fetch_to_file(&url, &dest, &opts, &control))
                .await
                .map_err(|e| FetchError::Storage(std::io::Error::other(e)))?
        }
    })
    .await;

    match result {
        Ok(bytes) => {
            tracing::info!(url = %asset.url, bytes, "downloaded {}", asset.name);
            asset.local_path = Some(dest);
            asset.transition(AssetState::Downloaded);
            Ok(bytes)
        }
        Err(source) => {
            tracing::warn!(url = %asset.url, "download failed: {}", source);
            asset.transition(AssetState::Failed);
            Err(AssetError::Download {
                url: asset.url.clone(),
                source,
            })
        }
    }
}
