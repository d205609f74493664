//! WOFF2: a single Brotli stream carrying optionally transformed tables.

mod glyf;
mod hmtx;

use std::io::Read;

use super::reader::Reader;
use super::sfnt::{self, Table, COLLECTION_TAG};
use super::{DecodeError, FontDecoder, DEFAULT_MAX_DECODED_SIZE};

const SIGNATURE: u32 = u32::from_be_bytes(*b"wOF2");
const HEADER_LEN: usize = 48;
const EXPLICIT_TAG_INDEX: u8 = 63;
const HHEA_NUM_H_METRICS_OFFSET: usize = 34;
const HEAD_INDEX_TO_LOC_OFFSET: usize = 50;

/// Tags addressable by index in the table directory flags byte.
const KNOWN_TAGS: [&[u8; 4]; 63] = [
    b"cmap", b"head", b"hhea", b"hmtx", b"maxp", b"name", b"OS/2", b"post", b"cvt ", b"fpgm",
    b"glyf", b"loca", b"prep", b"CFF ", b"VORG", b"EBDT", b"EBLC", b"gasp", b"hdmx", b"kern",
    b"LTSH", b"PCLT", b"VDMX", b"vhea", b"vmtx", b"BASE", b"GDEF", b"GPOS", b"GSUB", b"EBSC",
    b"JSTF", b"MATH", b"CBDT", b"CBLC", b"COLR", b"CPAL", b"SVG ", b"sbix", b"acnt", b"avar",
    b"bdat", b"bloc", b"bsln", b"cvar", b"fdsc", b"feat", b"fmtx", b"fvar", b"gvar", b"hsty",
    b"just", b"lcar", b"mort", b"morx", b"opbd", b"prop", b"trak", b"Zapf", b"Silf", b"Glat",
    b"Gloc", b"Feat", b"Sill",
];

#[derive(Debug, Clone)]
pub struct Woff2Decoder {
    max_decoded_size: u64,
}

impl Woff2Decoder {
    pub fn new() -> Self {
        Self {
            max_decoded_size: DEFAULT_MAX_DECODED_SIZE,
        }
    }

    pub fn with_max_decoded_size(max_decoded_size: u64) -> Self {
        Self { max_decoded_size }
    }
}

impl Default for Woff2Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct TableEntry {
    tag: [u8; 4],
    orig_length: u32,
    transformed: bool,
    transform_length: u32,
}

fn read_directory(r: &mut Reader<'_>, num_tables: usize) -> Result<Vec<TableEntry>, DecodeError> {
    let mut entries: Vec<TableEntry> = Vec::with_capacity(num_tables);
    for _ in 0..num_tables {
        let flags = r.u8()?;
        let index = flags & 0x3F;
        let tag = if index == EXPLICIT_TAG_INDEX {
            r.u32()?.to_be_bytes()
        } else {
            *KNOWN_TAGS[usize::from(index)]
        };
        let version = flags >> 6;
        let orig_length = r.base128()?;
        let transformed = if &tag == b"glyf" || &tag == b"loca" {
            version == 0
        } else {
            version != 0
        };
        let transform_length = if transformed { r.base128()? } else { orig_length };
        if &tag == b"loca" && transformed && transform_length != 0 {
            return Err(DecodeError::Malformed("transformed loca must be empty".into()));
        }
        if transformed && &tag != b"glyf" && &tag != b"loca" && !(&tag == b"hmtx" && version == 1) {
            return Err(DecodeError::Unsupported(format!(
                "transform version {version} of table {}",
                sfnt::tag_str(tag)
            )));
        }
        if entries.iter().any(|e| e.tag == tag) {
            return Err(DecodeError::Malformed(format!("duplicate table {}", sfnt::tag_str(tag))));
        }
        entries.push(TableEntry {
            tag,
            orig_length,
            transformed,
            transform_length,
        });
    }
    Ok(entries)
}

impl FontDecoder for Woff2Decoder {
    fn name(&self) -> &str {
        "woff2"
    }

    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, DecodeError> {
        if input.len() < HEADER_LEN {
            return Err(DecodeError::Truncated("WOFF2 header"));
        }
        let mut r = Reader::new(input, "WOFF2 header");
        if r.u32()? != SIGNATURE {
            return Err(DecodeError::BadSignature { expected: "wOF2" });
        }
        let flavor = r.u32()?;
        if flavor == COLLECTION_TAG {
            return Err(DecodeError::Unsupported("font collections".into()));
        }
        let length = r.u32()? as usize;
        let num_tables = usize::from(r.u16()?);
        let _reserved = r.u16()?;
        let total_sfnt_size = u64::from(r.u32()?);
        let total_compressed_size = r.u32()? as usize;

        if length != input.len() {
            return Err(DecodeError::Malformed(format!(
                "header length {length} does not match file size {}",
                input.len()
            )));
        }
        if num_tables == 0 {
            return Err(DecodeError::Malformed("font has no tables".into()));
        }
        if total_sfnt_size > self.max_decoded_size {
            return Err(DecodeError::TooLarge {
                size: total_sfnt_size,
                limit: self.max_decoded_size,
            });
        }

        let mut dir = Reader::new(&input[HEADER_LEN..], "WOFF2 table directory");
        let entries = read_directory(&mut dir, num_tables)?;
        let stream_start = HEADER_LEN + dir.position();
        let compressed = input
            .get(stream_start..stream_start.saturating_add(total_compressed_size))
            .ok_or(DecodeError::Truncated("WOFF2 compressed stream"))?;

        let expected: u64 = entries.iter().map(|e| u64::from(e.transform_length)).sum();
        if expected > self.max_decoded_size {
            return Err(DecodeError::TooLarge {
                size: expected,
                limit: self.max_decoded_size,
            });
        }
        let stream = decompress(compressed, expected)?;

        let mut at = 0usize;
        let mut payloads = Vec::with_capacity(entries.len());
        for entry in &entries {
            let len = entry.transform_length as usize;
            payloads.push(&stream[at..at + len]);
            at += len;
        }

        let tables = reconstruct_tables(&entries, &payloads)?;
        tracing::debug!(
            tables = tables.len(),
            flavor = format_args!("{flavor:#010x}"),
            "decoded woff2"
        );
        sfnt::build(flavor, tables)
    }
}

fn decompress(compressed: &[u8], expected: u64) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(expected as usize);
    brotli::Decompressor::new(compressed, 4096)
        .take(expected + 1)
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Decompress(format!("brotli: {e}")))?;
    if out.len() as u64 != expected {
        return Err(DecodeError::Malformed(format!(
            "decompressed stream is {} bytes, table directory expects {expected}",
            out.len()
        )));
    }
    Ok(out)
}

fn reconstruct_tables(entries: &[TableEntry], payloads: &[&[u8]]) -> Result<Vec<Table>, DecodeError> {
    let find = |tag: &[u8; 4]| entries.iter().position(|e| &e.tag == tag);
    let glyf = find(b"glyf");
    let loca = find(b"loca");

    let glyf_transformed = glyf.is_some_and(|i| entries[i].transformed);
    let loca_transformed = loca.is_some_and(|i| entries[i].transformed);
    if glyf_transformed != loca_transformed {
        return Err(DecodeError::Malformed("glyf and loca transforms disagree".into()));
    }

    let rebuilt = match glyf {
        Some(i) if glyf_transformed => Some(glyf::reconstruct(payloads[i])?),
        _ => None,
    };
    if let (Some(rebuilt), Some(i)) = (&rebuilt, loca) {
        if rebuilt.loca.len() != entries[i].orig_length as usize {
            tracing::debug!(
                expected = entries[i].orig_length,
                actual = rebuilt.loca.len(),
                "reconstructed loca length differs from directory"
            );
        }
    }

    let mut tables = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let data = match (&entry.tag, &rebuilt) {
            (b"glyf", Some(rebuilt)) => rebuilt.glyf.clone(),
            (b"loca", Some(rebuilt)) => rebuilt.loca.clone(),
            (b"head", Some(rebuilt)) => {
                let mut head = payloads[i].to_vec();
                if head.len() < HEAD_INDEX_TO_LOC_OFFSET + 2 {
                    return Err(DecodeError::Truncated("head table"));
                }
                head[HEAD_INDEX_TO_LOC_OFFSET..HEAD_INDEX_TO_LOC_OFFSET + 2]
                    .copy_from_slice(&rebuilt.index_format.to_be_bytes());
                head
            }
            (b"hmtx", _) if entry.transformed => {
                let rebuilt = rebuilt.as_ref().ok_or_else(|| {
                    DecodeError::Malformed("transformed hmtx without transformed glyf".into())
                })?;
                let hhea = find(b"hhea")
                    .map(|h| payloads[h])
                    .ok_or_else(|| DecodeError::Malformed("transformed hmtx without hhea".into()))?;
                let num_h_metrics = hhea
                    .get(HHEA_NUM_H_METRICS_OFFSET..HHEA_NUM_H_METRICS_OFFSET + 2)
                    .map(|b| usize::from(u16::from_be_bytes([b[0], b[1]])))
                    .ok_or(DecodeError::Truncated("hhea table"))?;
                hmtx::reconstruct(payloads[i], num_h_metrics, &rebuilt.x_mins)?
            }
            _ => payloads[i].to_vec(),
        };
        tables.push(Table::new(entry.tag, data));
    }
    Ok(tables)
}
