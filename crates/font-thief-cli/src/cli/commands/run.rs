//! `font-thief --site <url>`: discover, download and convert.

use anyhow::{Context, Result};
use font_thief_core::config::FontThiefConfig;
use font_thief_core::coordinator::{self, RunOptions, RunReport};
use font_thief_core::fetch::FetchOptions;
use font_thief_core::loader::{HarPageLoader, PageLoader, StaticPageLoader};
use font_thief_core::{AssetOutcome, DecoderRegistry, RunContext, RunControl};
use std::sync::Arc;

use crate::cli::{Cli, ExitStatus};

pub async fn run_site(cli: &Cli, cfg: &FontThiefConfig, ctx: &RunContext) -> Result<ExitStatus> {
    let control = RunControl::new();
    let ctrl_c = {
        let control = control.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ninterrupted, cleaning up...");
                control.cancel();
            }
        })
    };

    let loader: Box<dyn PageLoader> = match &cli.har {
        Some(path) => {
            tracing::info!(har = %path.display(), "replaying HAR capture");
            Box::new(HarPageLoader::new(path.clone()))
        }
        None => Box::new(StaticPageLoader::new(
            FetchOptions::from_config(cfg),
            control.clone(),
        )),
    };

    println!("Looking for fonts on {}", ctx.site());
    let result = coordinator::run(
        ctx,
        loader.as_ref(),
        Arc::new(DecoderRegistry::with_builtin()),
        &RunOptions::from_config(cfg),
        &control,
    )
    .await;
    ctrl_c.abort();

    let report = result.with_context(|| format!("harvesting fonts from {}", ctx.site()))?;
    print_report(&report);
    Ok(exit_status(&report))
}

fn exit_status(report: &RunReport) -> ExitStatus {
    if report.any_failed() {
        ExitStatus::SomeFailed
    } else {
        ExitStatus::Success
    }
}

fn print_report(report: &RunReport) {
    if report.no_fonts_found() {
        println!("No fonts found.");
        return;
    }

    println!("Found {} font(s):", report.discovered);
    for asset in &report.assets {
        let shown = asset
            .path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| asset.name.clone());
        match &asset.outcome {
            AssetOutcome::Failed(e) => println!("  [failed]     {}: {}", asset.url, e),
            AssetOutcome::Skipped(reason) => {
                println!("  [skipped]    {} ({})", shown, reason)
            }
            outcome => println!("  [{:<10}] {}", outcome.to_string(), shown),
        }
    }

    let counts = report.counts();
    if let Some(dir) = &report.destination {
        println!(
            "Saved to {} ({} downloaded, {} converted, {} skipped, {} failed)",
            dir.display(),
            counts.downloaded,
            counts.converted,
            counts.skipped,
            counts.failed
        );
    }
}
