//! SHA-256 digests of saved font files, recorded in the run report.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const BUF_SIZE: usize = 64 * 1024;

/// SHA-256 of a file as lowercase hex. Reads in chunks.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// [`sha256_path`] on a blocking thread. Errors are logged and yield `None`;
/// a missing digest never fails an asset.
pub async fn sha256_for_report(path: PathBuf) -> Option<String> {
    let shown = path.display().to_string();
    match tokio::task::spawn_blocking(move || sha256_path(&path)).await {
        Ok(Ok(digest)) => Some(digest),
        Ok(Err(e)) => {
            tracing::warn!(path = %shown, "checksum failed: {:#}", e);
            None
        }
        Err(e) => {
            tracing::warn!(path = %shown, "checksum task failed: {}", e);
            None
        }
    }
}
