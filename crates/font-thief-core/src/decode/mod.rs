//! Font decoders and the registry that maps container kinds to them.
//!
//! A decoder turns the bytes of a compressed web-font container into a
//! plain sfnt. Containers are identified by a tag: the lower-case file
//! extension without the dot (`woff`, `woff2`). The registry is an open
//! capability map; callers may register decoders for further kinds.
//!
//! Built-ins:
//! - `woff`: per-table zlib (flate2)
//! - `woff2`: single Brotli stream with glyf/loca and hmtx transforms

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

mod reader;
pub mod sfnt;
mod woff;
mod woff2;

pub use woff::WoffDecoder;
pub use woff2::Woff2Decoder;

/// Upper bound on the size of a decoded font. Guards against
/// decompression bombs.
pub const DEFAULT_MAX_DECODED_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("not a {expected} file (bad signature)")]
    BadSignature { expected: &'static str },

    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("malformed font: {0}")]
    Malformed(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("decoded size {size} exceeds limit {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("decompression failed: {0}")]
    Decompress(String),
}

/// Decodes one container kind into sfnt bytes.
///
/// Implementations are pure functions of their input and are called from
/// blocking worker threads.
pub trait FontDecoder: Send + Sync {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, DecodeError>;

    /// Short name for logs, e.g. `woff2`.
    fn name(&self) -> &str;
}

/// Adapts a closure into a [`FontDecoder`].
pub struct FnDecoder<F> {
    name: String,
    f: F,
}

impl<F> FnDecoder<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, DecodeError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> FontDecoder for FnDecoder<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, DecodeError> + Send + Sync,
{
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, DecodeError> {
        (self.f)(input)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Normalizes `.WOFF2` / `woff2` / `Woff2` to `woff2`.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<String, Arc<dyn FontDecoder>>,
}

impl DecoderRegistry {
    /// Empty registry: every conversion is skipped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `woff` and `woff2` decoders.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("woff", Arc::new(WoffDecoder::new()));
        registry.register("woff2", Arc::new(Woff2Decoder::new()));
        registry
    }

    /// Registers `decoder` for `tag`, returning the decoder it replaced.
    pub fn register(
        &mut self,
        tag: &str,
        decoder: Arc<dyn FontDecoder>,
    ) -> Option<Arc<dyn FontDecoder>> {
        self.decoders.insert(normalize_tag(tag), decoder)
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn FontDecoder>> {
        self.decoders.get(&normalize_tag(tag)).cloned()
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.decoders.keys().cloned().collect();
        tags.sort();
        tags
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
