use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Retry policy parameters for font downloads (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per font (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 10,
        }
    }
}

/// Global configuration loaded from `~/.config/font-thief/config.toml`.
///
/// A timeout of 0 disables that timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontThiefConfig {
    /// Maximum number of fonts downloaded/converted at once.
    pub max_concurrent_downloads: usize,
    /// Discovery is complete once this long passes without a new font response
    /// after the page load settled.
    pub quiescence_window_ms: u64,
    /// Upper bound on discovery after navigation, however busy the page stays.
    pub max_settle_secs: u64,
    /// Limit on the page navigation itself.
    pub navigation_timeout_secs: u64,
    /// Limit on one font transfer.
    pub fetch_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Limit on decoding one font container.
    pub decode_timeout_secs: u64,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for FontThiefConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 8,
            quiescence_window_ms: 1500,
            max_settle_secs: 30,
            navigation_timeout_secs: 60,
            fetch_timeout_secs: 120,
            connect_timeout_secs: 30,
            decode_timeout_secs: 60,
            user_agent: format!("font-thief/{}", env!("CARGO_PKG_VERSION")),
            retry: None,
        }
    }
}

impl FontThiefConfig {
    pub fn quiescence_window(&self) -> Duration {
        Duration::from_millis(self.quiescence_window_ms)
    }

    pub fn max_settle(&self) -> Option<Duration> {
        secs(self.max_settle_secs)
    }

    pub fn navigation_timeout(&self) -> Option<Duration> {
        secs(self.navigation_timeout_secs)
    }

    pub fn decode_timeout(&self) -> Option<Duration> {
        secs(self.decode_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

fn secs(n: u64) -> Option<Duration> {
    (n > 0).then(|| Duration::from_secs(n))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("font-thief")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FontThiefConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FontThiefConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FontThiefConfig = toml::from_str(&data)?;
    Ok(cfg)
}
