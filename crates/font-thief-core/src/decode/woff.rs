//! WOFF 1.0: per-table zlib compression around an sfnt.

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::reader::Reader;
use super::sfnt::{self, Table, COLLECTION_TAG};
use super::{DecodeError, FontDecoder, DEFAULT_MAX_DECODED_SIZE};

const SIGNATURE: u32 = u32::from_be_bytes(*b"wOFF");
const HEADER_LEN: usize = 44;
const TABLE_ENTRY_LEN: usize = 20;

#[derive(Debug, Clone)]
pub struct WoffDecoder {
    max_decoded_size: u64,
}

impl WoffDecoder {
    pub fn new() -> Self {
        Self {
            max_decoded_size: DEFAULT_MAX_DECODED_SIZE,
        }
    }

    pub fn with_max_decoded_size(max_decoded_size: u64) -> Self {
        Self { max_decoded_size }
    }
}

impl Default for WoffDecoder {
    fn default() -> Self {
        Self::new()
    }
}

struct TableEntry {
    tag: [u8; 4],
    offset: usize,
    comp_length: usize,
    orig_length: usize,
}

impl FontDecoder for WoffDecoder {
    fn name(&self) -> &str {
        "woff"
    }

    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut r = Reader::new(input, "WOFF header");
        if input.len() < HEADER_LEN {
            return Err(DecodeError::Truncated("WOFF header"));
        }
        let signature = r.u32()?;
        if signature != SIGNATURE {
            return Err(DecodeError::BadSignature { expected: "wOFF" });
        }
        let flavor = r.u32()?;
        if flavor == COLLECTION_TAG {
            return Err(DecodeError::Unsupported("font collections".into()));
        }
        let length = r.u32()? as usize;
        let num_tables = r.u16()? as usize;
        let reserved = r.u16()?;
        let total_sfnt_size = u64::from(r.u32()?);
        if reserved != 0 {
            return Err(DecodeError::Malformed("reserved header field is non-zero".into()));
        }
        if length > input.len() {
            return Err(DecodeError::Truncated("WOFF data"));
        }
        if total_sfnt_size > self.max_decoded_size {
            return Err(DecodeError::TooLarge {
                size: total_sfnt_size,
                limit: self.max_decoded_size,
            });
        }
        if num_tables == 0 {
            return Err(DecodeError::Malformed("font has no tables".into()));
        }

        let mut dir = Reader::new(&input[HEADER_LEN..], "WOFF table directory");
        let mut entries = Vec::with_capacity(num_tables);
        for _ in 0..num_tables {
            let entry = dir.bytes(TABLE_ENTRY_LEN)?;
            let mut e = Reader::new(entry, "WOFF table directory");
            let tag: [u8; 4] = e.bytes(4)?.try_into().map_err(|_| DecodeError::Truncated("tag"))?;
            entries.push(TableEntry {
                tag,
                offset: e.u32()? as usize,
                comp_length: e.u32()? as usize,
                orig_length: e.u32()? as usize,
            });
        }

        let mut decoded_total = 0u64;
        let mut tables = Vec::with_capacity(entries.len());
        for entry in entries {
            let tag = sfnt::tag_str(entry.tag);
            let end = entry
                .offset
                .checked_add(entry.comp_length)
                .filter(|end| *end <= length)
                .ok_or_else(|| DecodeError::Malformed(format!("table {tag} lies outside the file")))?;
            decoded_total += entry.orig_length as u64;
            if decoded_total > self.max_decoded_size {
                return Err(DecodeError::TooLarge {
                    size: decoded_total,
                    limit: self.max_decoded_size,
                });
            }

            let raw = &input[entry.offset..end];
            let data = if entry.comp_length == entry.orig_length {
                raw.to_vec()
            } else if entry.comp_length < entry.orig_length {
                inflate(raw, entry.orig_length, &tag)?
            } else {
                return Err(DecodeError::Malformed(format!(
                    "table {tag} compressed length exceeds original length"
                )));
            };
            tables.push(Table::new(entry.tag, data));
        }

        tracing::debug!(tables = tables.len(), flavor = format_args!("{flavor:#010x}"), "decoded woff");
        sfnt::build(flavor, tables)
    }
}

fn inflate(raw: &[u8], orig_length: usize, tag: &str) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(orig_length);
    ZlibDecoder::new(raw)
        .take(orig_length as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Decompress(format!("table {tag}: {e}")))?;
    if out.len() != orig_length {
        return Err(DecodeError::Malformed(format!(
            "table {tag} inflated to {} bytes, expected {orig_length}",
            out.len()
        )));
    }
    Ok(out)
}
