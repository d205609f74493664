//! Small but well-formed WOFF / WOFF2 files for end-to-end tests.

use std::io::Write;

/// `head` table with the magic number set.
pub fn head_table() -> Vec<u8> {
    let mut head = vec![0u8; 54];
    head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
    head[18..20].copy_from_slice(&1000u16.to_be_bytes());
    head
}

fn name_table() -> Vec<u8> {
    b"\x00\x00\x00\x00\x00\x06font-thief test".to_vec()
}

fn base128(mut v: u32) -> Vec<u8> {
    let mut out = vec![(v & 0x7F) as u8];
    v >>= 7;
    while v > 0 {
        out.insert(0, (v & 0x7F) as u8 | 0x80);
        v >>= 7;
    }
    out
}

/// CFF-flavored WOFF2 with `head`, `name` and `CFF ` stored untransformed.
pub fn sample_woff2() -> Vec<u8> {
    // (known tag index, data)
    let tables: [(u8, Vec<u8>); 3] = [
        (1, head_table()),
        (5, name_table()),
        (13, b"CFF outline bytes".to_vec()),
    ];
    let mut dir = Vec::new();
    let mut stream = Vec::new();
    for (index, data) in &tables {
        dir.push(*index);
        dir.extend(base128(data.len() as u32));
        stream.extend_from_slice(data);
    }
    let mut compressed = Vec::new();
    {
        let mut w = brotli::CompressorWriter::new(&mut compressed, 4096, 11, 22);
        w.write_all(&stream).unwrap();
    }

    let total = 48 + dir.len() + compressed.len();
    let mut out = Vec::new();
    out.extend_from_slice(b"wOF2");
    out.extend_from_slice(b"OTTO");
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&1024u32.to_be_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
    out.extend_from_slice(&[0, 1, 0, 0]);
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&dir);
    out.extend_from_slice(&compressed);
    out
}

/// TrueType-flavored WOFF with a zlib-compressed `name` table.
pub fn sample_woff() -> Vec<u8> {
    let name = name_table().repeat(4);
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    enc.write_all(&name).unwrap();
    let compressed_name = enc.finish().unwrap();

    let tables: [(&[u8; 4], Vec<u8>, Vec<u8>); 2] = [
        (b"head", head_table(), head_table()),
        (b"name", name, compressed_name),
    ];
    let header_len = 44 + 20 * tables.len();
    let mut dir = Vec::new();
    let mut body = Vec::new();
    for (tag, orig, stored) in &tables {
        let offset = header_len + body.len();
        dir.extend_from_slice(*tag);
        dir.extend_from_slice(&(offset as u32).to_be_bytes());
        dir.extend_from_slice(&(stored.len() as u32).to_be_bytes());
        dir.extend_from_slice(&(orig.len() as u32).to_be_bytes());
        dir.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(stored);
        while body.len() % 4 != 0 {
            body.push(0);
        }
    }

    let total = header_len + body.len();
    let mut out = Vec::new();
    out.extend_from_slice(b"wOFF");
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&1024u32.to_be_bytes());
    out.extend_from_slice(&[0, 1, 0, 0]);
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&dir);
    out.extend_from_slice(&body);
    out
}

/// Tag list of an sfnt, in directory order.
pub fn sfnt_tags(font: &[u8]) -> Vec<String> {
    let n = u16::from_be_bytes([font[4], font[5]]) as usize;
    (0..n)
        .map(|i| String::from_utf8_lossy(&font[12 + i * 16..16 + i * 16]).into_owned())
        .collect()
}
