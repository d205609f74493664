//! File lifecycle for downloads and conversion output.
//!
//! Bytes are always written to a `.part` sibling first and renamed onto the
//! final name only once complete. A part file that is dropped without being
//! finalized is deleted, so an aborted write never leaves a truncated file
//! under the final name or a stray `.part` behind.

mod part;

pub use part::PartFile;

/// Temporary file suffix used before the atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.woff2` → `a.woff2.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

/// Writes `data` to `final_path` through a part file.
pub fn write_atomic(final_path: &std::path::Path, data: &[u8]) -> std::io::Result<()> {
    let mut part = PartFile::create(final_path)?;
    part.write_all(data)?;
    part.finalize()
}
