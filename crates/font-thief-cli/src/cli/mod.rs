//! CLI for font-thief.

mod commands;

use anyhow::Result;
use clap::Parser;
use font_thief_core::{config, RunContext, RunError};
use std::path::PathBuf;

use commands::run_site;

/// Download the fonts a webpage uses.
#[derive(Debug, Parser)]
#[command(name = "font-thief", version)]
#[command(
    about = "Find the fonts a webpage loads and save them locally",
    long_about = None
)]
pub struct Cli {
    /// Page to harvest fonts from (http or https URL).
    #[arg(short = 's', long, value_name = "URL")]
    pub site: String,

    /// Convert WOFF/WOFF2 downloads to this format (ttf or otf).
    #[arg(short = 'c', long, value_name = "FORMAT", default_value = "otf")]
    pub convert: String,

    /// Keep the fonts exactly as downloaded.
    #[arg(long, conflicts_with = "convert")]
    pub no_convert: bool,

    /// Discover fonts from a HAR capture instead of fetching the page.
    #[arg(long, value_name = "FILE")]
    pub har: Option<PathBuf>,

    /// Directory that receives the `font-thief-<site>` folder (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (overrides the config file).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,
}

impl Cli {
    /// Requested output format; `None` keeps the containers.
    pub fn requested_format(&self) -> Option<&str> {
        (!self.no_convert).then_some(self.convert.as_str())
    }

    pub async fn run_from_args() -> Result<ExitStatus> {
        Cli::parse().run().await
    }

    /// Builds the run context first so a bad `--site` is reported before
    /// the config file is created.
    pub async fn run(&self) -> Result<ExitStatus> {
        let output_root = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let ctx = RunContext::new(&self.site, self.requested_format(), &output_root)?;

        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        if let Some(jobs) = self.jobs {
            cfg.max_concurrent_downloads = usize::from(jobs);
        }
        run_site(self, &cfg, &ctx).await
    }
}

/// Process exit status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every font saved (converted or skipped counts), or nothing found.
    Success,
    /// At least one font failed.
    SomeFailed,
    /// The run itself failed.
    Error,
    /// Interrupted.
    Cancelled,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Error => 1,
            ExitStatus::SomeFailed => 2,
            ExitStatus::Cancelled => 130,
        }
    }

    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<RunError>() {
            Some(RunError::Cancelled) => ExitStatus::Cancelled,
            _ => ExitStatus::Error,
        }
    }
}

#[cfg(test)]
mod tests;
