//! font-thief core: find the fonts a webpage loads, download them into a
//! per-site directory and optionally unpack WOFF/WOFF2 into ttf/otf.

pub mod config;
pub mod logging;

pub mod asset;
pub mod checksum;
pub mod context;
pub mod control;
pub mod convert;
pub mod coordinator;
pub mod decode;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod observer;
pub mod registry;
pub mod retry;
pub mod storage;
pub mod url_model;

pub use asset::{AssetOutcome, AssetReport, AssetState, FontAsset, SkipReason};
pub use context::RunContext;
pub use control::RunControl;
pub use coordinator::{run, RunOptions, RunReport};
pub use decode::{DecoderRegistry, FontDecoder};
pub use error::{AssetError, RunError};
