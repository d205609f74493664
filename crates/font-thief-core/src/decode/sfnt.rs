//! Assembles a plain sfnt (TrueType / CFF OpenType) file from tables.

use super::DecodeError;

pub const TRUETYPE_FLAVOR: u32 = 0x0001_0000;
pub const CFF_FLAVOR: u32 = u32::from_be_bytes(*b"OTTO");
pub const COLLECTION_TAG: u32 = u32::from_be_bytes(*b"ttcf");

const HEADER_LEN: usize = 12;
const TABLE_RECORD_LEN: usize = 16;
const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;
const HEAD_ADJUSTMENT_OFFSET: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub tag: [u8; 4],
    pub data: Vec<u8>,
}

impl Table {
    pub fn new(tag: [u8; 4], data: Vec<u8>) -> Self {
        Self { tag, data }
    }
}

/// Human-readable tag, e.g. `glyf` or `OS/2`.
pub fn tag_str(tag: [u8; 4]) -> String {
    String::from_utf8_lossy(&tag).into_owned()
}

/// Sum of big-endian u32 words, the last one zero-padded.
pub fn checksum(data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(4);
    let mut sum = chunks.by_ref().fold(0u32, |acc, c| {
        acc.wrapping_add(u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
    });
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut word = [0u8; 4];
        word[..rest.len()].copy_from_slice(rest);
        sum = sum.wrapping_add(u32::from_be_bytes(word));
    }
    sum
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Writes an sfnt: table records sorted by tag, each table 4-byte aligned,
/// checksums recomputed and `head.checkSumAdjustment` fixed up.
pub fn build(flavor: u32, mut tables: Vec<Table>) -> Result<Vec<u8>, DecodeError> {
    if tables.is_empty() {
        return Err(DecodeError::Malformed("font has no tables".into()));
    }
    // searchRange and rangeShift are u16 multiples of the record length.
    let max_tables = usize::from(u16::MAX) / TABLE_RECORD_LEN;
    if tables.len() > max_tables {
        return Err(DecodeError::Malformed(format!(
            "{} tables, at most {} fit a table directory",
            tables.len(),
            max_tables
        )));
    }
    tables.sort_by(|a, b| a.tag.cmp(&b.tag));
    if tables.windows(2).any(|w| w[0].tag == w[1].tag) {
        return Err(DecodeError::Malformed("duplicate table tag".into()));
    }

    let mut head_offset = None;
    for table in tables.iter_mut().filter(|t| &t.tag == b"head") {
        if table.data.len() < HEAD_ADJUSTMENT_OFFSET + 4 {
            return Err(DecodeError::Truncated("head table"));
        }
        table.data[HEAD_ADJUSTMENT_OFFSET..HEAD_ADJUSTMENT_OFFSET + 4].fill(0);
    }

    let num_tables = tables.len() as u16;
    let mut entry_selector = 0u16;
    while (1u32 << (entry_selector + 1)) <= u32::from(num_tables) {
        entry_selector += 1;
    }
    let search_range = (1u32 << entry_selector) * TABLE_RECORD_LEN as u32;
    let range_shift = u32::from(num_tables) * TABLE_RECORD_LEN as u32 - search_range;
    let (search_range, range_shift) = (search_range as u16, range_shift as u16);

    let directory_len = HEADER_LEN + TABLE_RECORD_LEN * tables.len();
    let total = directory_len + tables.iter().map(|t| padded_len(t.data.len())).sum::<usize>();
    if total > u32::MAX as usize {
        return Err(DecodeError::TooLarge {
            size: total as u64,
            limit: u64::from(u32::MAX),
        });
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&flavor.to_be_bytes());
    out.extend_from_slice(&num_tables.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&range_shift.to_be_bytes());

    let mut offset = directory_len;
    for table in &tables {
        if &table.tag == b"head" {
            head_offset = Some(offset);
        }
        out.extend_from_slice(&table.tag);
        out.extend_from_slice(&checksum(&table.data).to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(table.data.len() as u32).to_be_bytes());
        offset += padded_len(table.data.len());
    }
    for table in &tables {
        out.extend_from_slice(&table.data);
        out.resize(padded_len(out.len()), 0);
    }

    if let Some(head) = head_offset {
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(&out));
        let at = head + HEAD_ADJUSTMENT_OFFSET;
        out[at..at + 4].copy_from_slice(&adjustment.to_be_bytes());
    }
    Ok(out)
}
