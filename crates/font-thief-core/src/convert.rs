//! Conversion dispatcher: turns a downloaded container into the requested
//! sfnt flavor when a decoder for it is registered.
//!
//! Total over every (container, format) pair: each call ends in
//! `Converted`, `Skipped(reason)` or `Failed(ConversionError)`. Skips and
//! failures leave the downloaded file untouched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::asset::{AssetOutcome, AssetState, FontAsset, SkipReason};
use crate::context::RunContext;
use crate::control::RunControl;
use crate::decode::{sfnt, DecoderRegistry};
use crate::error::AssetError;
use crate::storage;

/// Output formats the dispatcher can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Ttf,
    Otf,
}

impl OutputFormat {
    /// Case-insensitive; a leading dot is accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "ttf" => Some(OutputFormat::Ttf),
            "otf" => Some(OutputFormat::Otf),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Ttf => "ttf",
            OutputFormat::Otf => "otf",
        }
    }

    /// Flavor conventionally stored under this extension.
    fn matches_flavor(self, flavor: u32) -> bool {
        match self {
            OutputFormat::Ttf => flavor != sfnt::CFF_FLAVOR,
            OutputFormat::Otf => true,
        }
    }
}

/// Container tag of a file: its lower-case extension.
fn container_tag(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn skip(asset: &mut FontAsset, reason: SkipReason) -> AssetOutcome {
    if asset.state() == AssetState::Downloaded {
        asset.transition(AssetState::Skipped(reason));
    }
    tracing::debug!(name = %asset.name, %reason, "conversion skipped");
    AssetOutcome::Skipped(reason)
}

fn fail(asset: &mut FontAsset, message: String) -> AssetOutcome {
    tracing::warn!(name = %asset.name, %message, "conversion failed");
    asset.transition(AssetState::Failed);
    AssetOutcome::Failed(AssetError::Conversion {
        name: asset.name.clone(),
        message,
    })
}

/// Converts `asset` into `requested_format`.
///
/// Calling it again on a converted asset is a no-op: the output file has
/// no decoder and the call returns `Skipped(NoDecoder)`.
pub async fn convert(
    asset: &mut FontAsset,
    requested_format: &str,
    ctx: &RunContext,
    decoders: &DecoderRegistry,
    decode_timeout: Option<Duration>,
    control: &RunControl,
) -> AssetOutcome {
    let Some(format) = OutputFormat::parse(requested_format) else {
        return skip(asset, SkipReason::UnsupportedFormat);
    };
    let source = asset
        .local_path
        .clone()
        .unwrap_or_else(|| ctx.path_for(&asset.name));
    let Some(decoder) = container_tag(&source).and_then(|tag| decoders.get(&tag)) else {
        return skip(asset, SkipReason::NoDecoder);
    };

    asset.transition(AssetState::Converting);
    let input = match tokio::fs::read(&source).await {
        Ok(bytes) => bytes,
        Err(e) => return fail(asset, format!("reading {}: {}", source.display(), e)),
    };

    let decoder_name = decoder.name().to_string();
    let decode = tokio::task::spawn_blocking(move || decoder.decode(&input));
    let bounded = async {
        match decode_timeout {
            Some(limit) => tokio::time::timeout(limit, decode).await.map_err(|_| limit),
            None => Ok(decode.await),
        }
    };
    let joined = tokio::select! {
        biased;
        _ = control.cancelled() => return fail(asset, "cancelled".to_string()),
        res = bounded => match res {
            Ok(joined) => joined,
            Err(limit) => return fail(asset, format!("{decoder_name} decoder timed out after {limit:?}")),
        },
    };
    let decoded = match joined {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return fail(asset, format!("{decoder_name}: {e}")),
        Err(e) => return fail(asset, format!("{decoder_name} decoder panicked: {e}")),
    };

    if let Some(flavor) = decoded.get(0..4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]])) {
        if !format.matches_flavor(flavor) {
            tracing::warn!(
                name = %asset.name,
                format = format.extension(),
                "font has CFF outlines but is saved with a .ttf extension"
            );
        }
    }

    if control.is_cancelled() {
        return fail(asset, "cancelled".to_string());
    }
    let output = output_path(&source, format);
    if let Err(e) = write_output(output.clone(), decoded).await {
        return fail(asset, format!("writing {}: {}", output.display(), e));
    }
    if output != source {
        // The original must stay when the conversion does not complete.
        let removed = if control.is_cancelled() {
            Err("cancelled".to_string())
        } else {
            match tokio::fs::remove_file(&source).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    Err(format!("removing {}: {}", source.display(), e))
                }
                _ => Ok(()),
            }
        };
        if let Err(message) = removed {
            discard_output(&output).await;
            return fail(asset, message);
        }
    }

    tracing::info!(from = %source.display(), to = %output.display(), "converted");
    asset.local_path = Some(output);
    asset.transition(AssetState::Converted);
    AssetOutcome::Converted
}

/// `<dir>/<stem>.<format>`
fn output_path(source: &Path, format: OutputFormat) -> PathBuf {
    source.with_extension(format.extension())
}

async fn discard_output(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), "could not remove converted output: {}", e);
    }
}

async fn write_output(path: PathBuf, data: Vec<u8>) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || storage::write_atomic(&path, &data))
        .await
        .map_err(std::io::Error::other)?
}
