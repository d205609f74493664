//! Immutable per-run settings.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::RunError;
use crate::url_model::slugify;

/// Prefix of every run directory.
pub const RUN_DIR_PREFIX: &str = "font-thief-";

/// Checks that `input` is an absolute http(s) URL with a host.
pub fn validate_target_url(input: &str) -> Result<Url, RunError> {
    let invalid = |reason: &str| RunError::Validation {
        input: input.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(input.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

/// Configuration of one run. Built once, then only borrowed.
#[derive(Debug, Clone)]
pub struct RunContext {
    site: String,
    target: Url,
    requested_format: Option<String>,
    destination_dir: PathBuf,
}

impl RunContext {
    /// Validates `site` and derives the destination directory
    /// `<output_root>/font-thief-<slug(site)>`. No side effects.
    pub fn new(
        site: &str,
        requested_format: Option<&str>,
        output_root: &Path,
    ) -> Result<Self, RunError> {
        let target = validate_target_url(site)?;
        let destination_dir = output_root.join(format!("{}{}", RUN_DIR_PREFIX, slugify(site.trim())));
        Ok(Self {
            site: site.trim().to_string(),
            target,
            requested_format: requested_format
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
            destination_dir,
        })
    }

    /// The site exactly as the user gave it (trimmed).
    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Output format as requested, unparsed; `None` means keep the containers.
    pub fn requested_format(&self) -> Option<&str> {
        self.requested_format.as_deref()
    }

    pub fn conversion_requested(&self) -> bool {
        self.requested_format.is_some()
    }

    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.destination_dir.join(name)
    }
}
