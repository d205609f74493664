//! Run coordinator: discovery, then a bounded fan-out of per-asset work.
//!
//! The page loader is closed on every exit path. Once discovery is frozen
//! each asset is moved into its own task; at most
//! `max_concurrent_downloads` tasks run at once. [`run`] returns only after
//! every asset reached a terminal outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::asset::{AssetOutcome, AssetReport, FontAsset};
use crate::checksum::sha256_for_report;
use crate::config::FontThiefConfig;
use crate::context::RunContext;
use crate::control::RunControl;
use crate::convert::convert;
use crate::decode::DecoderRegistry;
use crate::downloader::{ensure_destination_directory, fetch_asset, DownloadSettings};
use crate::error::{AssetError, RunError};
use crate::loader::{BrowserHandle, NavigationResult, PageLoader};
use crate::observer::{observe, QuiescencePolicy};
use crate::registry::AssetRegistry;

/// Tunables of one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_concurrent_downloads: usize,
    pub download: DownloadSettings,
    pub quiescence: QuiescencePolicy,
    pub decode_timeout: Option<Duration>,
}

impl RunOptions {
    pub fn from_config(cfg: &FontThiefConfig) -> Self {
        Self {
            max_concurrent_downloads: cfg.max_concurrent_downloads.max(1),
            download: DownloadSettings::from_config(cfg),
            quiescence: QuiescencePolicy::from_config(cfg),
            decode_timeout: cfg.decode_timeout(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&FontThiefConfig::default())
    }
}

/// Per-outcome tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub downloaded: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.downloaded + self.converted + self.skipped + self.failed
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub site: String,
    /// Where fonts were saved. `None` when nothing was found.
    pub destination: Option<PathBuf>,
    pub navigation: NavigationResult,
    /// Number of distinct fonts discovered.
    pub discovered: usize,
    /// One entry per discovered font, in discovery order.
    pub assets: Vec<AssetReport>,
}

impl RunReport {
    pub fn no_fonts_found(&self) -> bool {
        self.discovered == 0
    }

    pub fn any_failed(&self) -> bool {
        self.assets.iter().any(|a| a.outcome.is_failure())
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for a in &self.assets {
            match a.outcome {
                AssetOutcome::Downloaded => counts.downloaded += 1,
                AssetOutcome::Converted => counts.converted += 1,
                AssetOutcome::Skipped(_) => counts.skipped += 1,
                AssetOutcome::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }
}

async fn discover(
    browser: &mut dyn BrowserHandle,
    ctx: &RunContext,
    registry: &AssetRegistry,
    policy: &QuiescencePolicy,
    control: &RunControl,
) -> Result<NavigationResult, RunError> {
    let mut page = browser.new_page().await.map_err(RunError::Loader)?;
    observe(page.as_mut(), ctx.target(), registry, policy, control).await
}

/// Runs the whole pipeline for `ctx`.
pub async fn run(
    ctx: &RunContext,
    loader: &dyn PageLoader,
    decoders: Arc<DecoderRegistry>,
    opts: &RunOptions,
    control: &RunControl,
) -> Result<RunReport, RunError> {
    if control.is_cancelled() {
        return Err(RunError::Cancelled);
    }
    tracing::info!(site = %ctx.site(), "starting run");

    let mut browser = tokio::select! {
        _ = control.cancelled() => return Err(RunError::Cancelled),
        launched = loader.launch() => launched.map_err(RunError::Loader)?,
    };
    let registry = AssetRegistry::new();
    let discovered = discover(browser.as_mut(), ctx, &registry, &opts.quiescence, control).await;
    if let Err(e) = browser.close().await {
        tracing::warn!("closing page loader failed: {:#}", e);
    }
    let navigation = discovered?;

    let assets = registry.freeze();
    tracing::info!(fonts = assets.len(), "discovery finished");
    if assets.is_empty() {
        return Ok(RunReport {
            site: ctx.site().to_string(),
            destination: None,
            navigation,
            discovered: 0,
            assets: Vec::new(),
        });
    }

    ensure_destination_directory(ctx).await?;
    let discovered = assets.len();
    let reports = process_all(assets, ctx, decoders, opts, control).await;
    debug_assert_eq!(reports.len(), discovered);

    if control.is_cancelled() {
        return Err(RunError::Cancelled);
    }
    let report = RunReport {
        site: ctx.site().to_string(),
        destination: Some(ctx.destination_dir().to_path_buf()),
        navigation,
        discovered,
        assets: reports,
    };
    let counts = report.counts();
    tracing::info!(
        downloaded = counts.downloaded,
        converted = counts.converted,
        skipped = counts.skipped,
        failed = counts.failed,
        "run finished"
    );
    Ok(report)
}

/// Fans out one task per asset with a bound on tasks in flight. Reports
/// come back in discovery order.
async fn process_all(
    assets: Vec<FontAsset>,
    ctx: &RunContext,
    decoders: Arc<DecoderRegistry>,
    opts: &RunOptions,
    control: &RunControl,
) -> Vec<AssetReport> {
    let max_concurrent = opts.max_concurrent_downloads.max(1);
    let ctx = Arc::new(ctx.clone());
    let settings = Arc::new(opts.download.clone());
    let decode_timeout = opts.decode_timeout;

    let identities: Vec<(String, String)> = assets.iter().map(|a| (a.url.clone(), a.name.clone())).collect();
    let mut slots: Vec<Option<AssetReport>> = identities.iter().map(|_| None).collect();
    let mut queue = assets.into_iter().enumerate();
    let mut join_set = JoinSet::new();

    loop {
        while join_set.len() < max_concurrent {
            let Some((index, asset)) = queue.next() else {
                break;
            };
            let ctx = Arc::clone(&ctx);
            let settings = Arc::clone(&settings);
            let decoders = Arc::clone(&decoders);
            let control = control.clone();
            join_set.spawn(async move {
                let report = process_asset(asset, &ctx, &settings, &decoders, decode_timeout, &control).await;
                (index, report)
            });
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        match joined {
            Ok((index, report)) => slots[index] = Some(report),
            Err(e) => tracing::error!("asset task failed: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(identities)
        .map(|(slot, (url, name))| {
            slot.unwrap_or_else(|| AssetReport {
                outcome: AssetOutcome::Failed(AssetError::Worker {
                    name: name.clone(),
                    message: "task ended without a report".into(),
                }),
                url,
                name,
                path: None,
                sha256: None,
            })
        })
        .collect()
}

/// Download, then convert when a format was requested.
async fn process_asset(
    mut asset: FontAsset,
    ctx: &RunContext,
    settings: &DownloadSettings,
    decoders: &DecoderRegistry,
    decode_timeout: Option<Duration>,
    control: &RunControl,
) -> AssetReport {
    let mut outcome = match fetch_asset(&mut asset, ctx, settings, control).await {
        Err(e) => AssetOutcome::Failed(e),
        Ok(_) => match ctx.requested_format() {
            None => AssetOutcome::Downloaded,
            Some(format) => convert(&mut asset, format, ctx, decoders, decode_timeout, control).await,
        },
    };
    if !asset.state().is_terminal(ctx.conversion_requested()) {
        tracing::error!(url = %asset.url, state = ?asset.state(), "asset work ended in a non-terminal state");
        outcome = AssetOutcome::Failed(AssetError::Worker {
            name: asset.name.clone(),
            message: format!("ended in state {:?}", asset.state()),
        });
    }

    let sha256 = match &asset.local_path {
        Some(path) => sha256_for_report(path.clone()).await,
        None => None,
    };
    AssetReport {
        url: asset.url,
        name: asset.name,
        path: asset.local_path,
        outcome,
        sha256,
    }
}
