//! Blocking curl transfers used by the downloader and the static page loader.
//!
//! Every transfer follows redirects, honours the run's cancel flag from the
//! progress callback and reports failures as [`FetchError`] so the retry
//! layer can classify them.

mod error;
mod get;
mod text;

pub use error::FetchError;
pub use get::fetch_to_file;
pub use text::{fetch_text, FetchedText};

use std::time::Duration;

use crate::config::FontThiefConfig;

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: u32 = 10;

/// Per-request curl settings derived from the config.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    /// Wall-clock limit for one whole transfer. `None` leaves curl unbounded.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl FetchOptions {
    pub fn from_config(cfg: &FontThiefConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: (cfg.fetch_timeout_secs > 0).then(|| Duration::from_secs(cfg.fetch_timeout_secs)),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from_config(&FontThiefConfig::default())
    }
}

/// Builds an easy handle with the options shared by every request.
fn easy_handle(url: &str, opts: &FetchOptions) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(MAX_REDIRECTS)?;
    easy.useragent(&opts.user_agent)?;
    easy.connect_timeout(opts.connect_timeout)?;
    if let Some(timeout) = opts.timeout {
        easy.timeout(timeout)?;
    }
    // Progress callbacks are how a transfer notices cancellation.
    easy.progress(true)?;
    Ok(easy)
}
