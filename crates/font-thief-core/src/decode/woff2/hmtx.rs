//! Reconstruction of the transformed `hmtx` table.

use crate::decode::reader::Reader;
use crate::decode::DecodeError;

const FLAG_NO_PROPORTIONAL_LSBS: u8 = 0x01;
const FLAG_NO_MONOSPACE_LSBS: u8 = 0x02;

/// Left side bearings omitted from the stream are restored from the
/// glyph xMin values.
pub(super) fn reconstruct(
    data: &[u8],
    num_h_metrics: usize,
    x_mins: &[i16],
) -> Result<Vec<u8>, DecodeError> {
    let num_glyphs = x_mins.len();
    if num_h_metrics == 0 || num_h_metrics > num_glyphs {
        return Err(DecodeError::Malformed(format!(
            "numberOfHMetrics {num_h_metrics} for {num_glyphs} glyphs"
        )));
    }

    let mut r = Reader::new(data, "transformed hmtx");
    let flags = r.u8()?;
    if flags & !(FLAG_NO_PROPORTIONAL_LSBS | FLAG_NO_MONOSPACE_LSBS) != 0 || flags == 0 {
        return Err(DecodeError::Malformed(format!("hmtx transform flags {flags:#04x}")));
    }

    let mut advances = Vec::with_capacity(num_h_metrics);
    for _ in 0..num_h_metrics {
        advances.push(r.u16()?);
    }
    let mut lsbs = Vec::with_capacity(num_glyphs);
    for (i, x_min) in x_mins.iter().enumerate() {
        let explicit = if i < num_h_metrics {
            flags & FLAG_NO_PROPORTIONAL_LSBS == 0
        } else {
            flags & FLAG_NO_MONOSPACE_LSBS == 0
        };
        lsbs.push(if explicit { r.i16()? } else { *x_min });
    }

    let mut out = Vec::with_capacity(num_h_metrics * 4 + (num_glyphs - num_h_metrics) * 2);
    for (advance, lsb) in advances.iter().zip(&lsbs) {
        out.extend_from_slice(&advance.to_be_bytes());
        out.extend_from_slice(&lsb.to_be_bytes());
    }
    for lsb in &lsbs[num_h_metrics..] {
        out.extend_from_slice(&lsb.to_be_bytes());
    }
    Ok(out)
}
