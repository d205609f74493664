//! Reconstruction of the transformed `glyf` / `loca` tables.

use crate::decode::reader::Reader;
use crate::decode::DecodeError;

const FLAG_ON_CURVE: u8 = 0x01;
const FLAG_X_SHORT: u8 = 0x02;
const FLAG_Y_SHORT: u8 = 0x04;
const FLAG_X_SAME_OR_POSITIVE: u8 = 0x10;
const FLAG_Y_SAME_OR_POSITIVE: u8 = 0x20;
const FLAG_OVERLAP_SIMPLE: u8 = 0x40;

const COMPOSITE_ARGS_ARE_WORDS: u16 = 0x0001;
const COMPOSITE_HAVE_SCALE: u16 = 0x0008;
const COMPOSITE_MORE_COMPONENTS: u16 = 0x0020;
const COMPOSITE_HAVE_XY_SCALE: u16 = 0x0040;
const COMPOSITE_HAVE_TWO_BY_TWO: u16 = 0x0080;
const COMPOSITE_HAVE_INSTRUCTIONS: u16 = 0x0100;

const OPTION_HAS_OVERLAP_BITMAP: u16 = 0x0001;

#[derive(Debug)]
pub(super) struct Reconstructed {
    pub glyf: Vec<u8>,
    pub loca: Vec<u8>,
    pub index_format: u16,
    /// Per-glyph xMin, needed to restore lsb values in `hmtx`.
    pub x_mins: Vec<i16>,
}

#[derive(Debug, Clone, Copy)]
struct Point {
    x: i32,
    y: i32,
    on_curve: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct BBox {
    x_min: i16,
    y_min: i16,
    x_max: i16,
    y_max: i16,
}

impl BBox {
    fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            x_min: r.i16()?,
            y_min: r.i16()?,
            x_max: r.i16()?,
            y_max: r.i16()?,
        })
    }

    fn of(points: &[Point]) -> Result<Self, DecodeError> {
        let Some(first) = points.first() else {
            return Ok(Self::default());
        };
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.y);
        }
        Ok(Self {
            x_min: coord(x_min)?,
            y_min: coord(y_min)?,
            x_max: coord(x_max)?,
            y_max: coord(y_max)?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        for v in [self.x_min, self.y_min, self.x_max, self.y_max] {
            out.extend_from_slice(&v.to_be_bytes());
        }
    }
}

fn coord(v: i32) -> Result<i16, DecodeError> {
    i16::try_from(v).map_err(|_| DecodeError::Malformed(format!("coordinate {v} out of range")))
}

pub(super) fn reconstruct(data: &[u8]) -> Result<Reconstructed, DecodeError> {
    let mut r = Reader::new(data, "transformed glyf header");
    let _reserved = r.u16()?;
    let option_flags = r.u16()?;
    let num_glyphs = usize::from(r.u16()?);
    let index_format = r.u16()?;
    if index_format > 1 {
        return Err(DecodeError::Malformed(format!("indexFormat {index_format}")));
    }
    let mut sizes = [0usize; 7];
    for size in &mut sizes {
        *size = r.u32()? as usize;
    }
    let [n_contour_size, n_points_size, flag_size, glyph_size, composite_size, bbox_size, instruction_size] =
        sizes;

    let mut n_contours = Reader::new(r.bytes(n_contour_size)?, "nContour stream");
    let mut n_points = Reader::new(r.bytes(n_points_size)?, "nPoints stream");
    let mut flags = Reader::new(r.bytes(flag_size)?, "flag stream");
    let mut glyphs = Reader::new(r.bytes(glyph_size)?, "glyph stream");
    let mut composites = Reader::new(r.bytes(composite_size)?, "composite stream");
    let bbox_all = r.bytes(bbox_size)?;
    let mut instructions = Reader::new(r.bytes(instruction_size)?, "instruction stream");
    let overlap_bitmap = if option_flags & OPTION_HAS_OVERLAP_BITMAP != 0 {
        Some(r.bytes(num_glyphs.div_ceil(8))?)
    } else {
        None
    };

    let bitmap_len = num_glyphs.div_ceil(32) * 4;
    if bbox_all.len() < bitmap_len {
        return Err(DecodeError::Truncated("bbox bitmap"));
    }
    let (bbox_bitmap, bbox_values) = bbox_all.split_at(bitmap_len);
    let mut bboxes = Reader::new(bbox_values, "bbox stream");
    let bit = |bits: &[u8], i: usize| bits[i >> 3] & (0x80 >> (i & 7)) != 0;

    let mut glyf = Vec::new();
    let mut offsets = Vec::with_capacity(num_glyphs + 1);
    let mut x_mins = Vec::with_capacity(num_glyphs);

    for i in 0..num_glyphs {
        offsets.push(glyf.len());
        let has_bbox = bit(bbox_bitmap, i);
        let contours = n_contours.i16()?;
        match contours {
            0 => {
                if has_bbox {
                    return Err(DecodeError::Malformed(format!("empty glyph {i} has a bbox")));
                }
                x_mins.push(0);
            }
            -1 => {
                if !has_bbox {
                    return Err(DecodeError::Malformed(format!("composite glyph {i} has no bbox")));
                }
                let bbox = BBox::read(&mut bboxes)?;
                let (components, have_instructions) = read_composite(&mut composites)?;
                glyf.extend_from_slice(&(-1i16).to_be_bytes());
                bbox.write(&mut glyf);
                glyf.extend_from_slice(components);
                if have_instructions {
                    let len = glyphs.u255_16()?;
                    glyf.extend_from_slice(&len.to_be_bytes());
                    glyf.extend_from_slice(instructions.bytes(usize::from(len))?);
                }
                x_mins.push(bbox.x_min);
            }
            n if n > 0 => {
                let overlap = overlap_bitmap.is_some_and(|bits| bit(bits, i));
                let bbox = write_simple(
                    n as u16,
                    has_bbox,
                    overlap,
                    &mut n_points,
                    &mut flags,
                    &mut glyphs,
                    &mut bboxes,
                    &mut instructions,
                    &mut glyf,
                )?;
                x_mins.push(bbox.x_min);
            }
            n => return Err(DecodeError::Malformed(format!("glyph {i} has {n} contours"))),
        }
        glyf.resize((glyf.len() + 3) & !3, 0);
    }
    offsets.push(glyf.len());

    let loca = encode_loca(&offsets, index_format)?;
    Ok(Reconstructed {
        glyf,
        loca,
        index_format,
        x_mins,
    })
}

/// Returns the raw component records and whether instructions follow.
fn read_composite<'a>(r: &mut Reader<'a>) -> Result<(&'a [u8], bool), DecodeError> {
    let start = r.position();
    let mut have_instructions = false;
    loop {
        let flags = r.u16()?;
        let _glyph_index = r.u16()?;
        let mut len = if flags & COMPOSITE_ARGS_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & COMPOSITE_HAVE_SCALE != 0 {
            len += 2;
        } else if flags & COMPOSITE_HAVE_XY_SCALE != 0 {
            len += 4;
        } else if flags & COMPOSITE_HAVE_TWO_BY_TWO != 0 {
            len += 8;
        }
        r.bytes(len)?;
        have_instructions |= flags & COMPOSITE_HAVE_INSTRUCTIONS != 0;
        if flags & COMPOSITE_MORE_COMPONENTS == 0 {
            break;
        }
    }
    Ok((r.since(start), have_instructions))
}

#[allow(clippy::too_many_arguments)]
fn write_simple(
    contours: u16,
    has_bbox: bool,
    overlap: bool,
    n_points: &mut Reader<'_>,
    flags: &mut Reader<'_>,
    glyphs: &mut Reader<'_>,
    bboxes: &mut Reader<'_>,
    instructions: &mut Reader<'_>,
    out: &mut Vec<u8>,
) -> Result<BBox, DecodeError> {
    let mut end_points = Vec::with_capacity(usize::from(contours));
    let mut total: u32 = 0;
    for _ in 0..contours {
        total += u32::from(n_points.u255_16()?);
        if total == 0 || total > u32::from(u16::MAX) {
            return Err(DecodeError::Malformed("bad contour point count".into()));
        }
        end_points.push((total - 1) as u16);
    }

    let mut points = Vec::with_capacity(total as usize);
    let (mut x, mut y) = (0i32, 0i32);
    for _ in 0..total {
        let flag = flags.u8()?;
        let triplet = flag & 0x7F;
        let data = glyphs.bytes(triplet_len(triplet))?;
        let (dx, dy) = decode_triplet(triplet, data);
        x += dx;
        y += dy;
        points.push(Point {
            x,
            y,
            on_curve: flag & 0x80 == 0,
        });
    }

    let instruction_len = glyphs.u255_16()?;
    let program = instructions.bytes(usize::from(instruction_len))?;
    let bbox = if has_bbox {
        BBox::read(bboxes)?
    } else {
        BBox::of(&points)?
    };

    out.extend_from_slice(&contours.to_be_bytes());
    bbox.write(out);
    for end in &end_points {
        out.extend_from_slice(&end.to_be_bytes());
    }
    out.extend_from_slice(&instruction_len.to_be_bytes());
    out.extend_from_slice(program);
    encode_points(&points, overlap, out)?;
    Ok(bbox)
}

fn triplet_len(flag: u8) -> usize {
    match flag {
        0..=83 => 1,
        84..=119 => 2,
        120..=123 => 3,
        _ => 4,
    }
}

fn with_sign(flag: u8, base: i32) -> i32 {
    if flag & 1 != 0 {
        base
    } else {
        -base
    }
}

fn decode_triplet(flag: u8, b: &[u8]) -> (i32, i32) {
    let byte = |i: usize| i32::from(b[i]);
    let f = i32::from(flag);
    if flag < 10 {
        (0, with_sign(flag, ((f & 14) << 7) + byte(0)))
    } else if flag < 20 {
        (with_sign(flag, (((f - 10) & 14) << 7) + byte(0)), 0)
    } else if flag < 84 {
        let b0 = f - 20;
        let b1 = byte(0);
        (
            with_sign(flag, 1 + (b0 & 0x30) + (b1 >> 4)),
            with_sign(flag >> 1, 1 + ((b0 & 0x0C) << 2) + (b1 & 0x0F)),
        )
    } else if flag < 120 {
        let b0 = f - 84;
        (
            with_sign(flag, 1 + ((b0 / 12) << 8) + byte(0)),
            with_sign(flag >> 1, 1 + (((b0 % 12) >> 2) << 8) + byte(1)),
        )
    } else if flag < 124 {
        let b2 = byte(1);
        (
            with_sign(flag, (byte(0) << 4) + (b2 >> 4)),
            with_sign(flag >> 1, ((b2 & 0x0F) << 8) + byte(2)),
        )
    } else {
        (
            with_sign(flag, (byte(0) << 8) + byte(1)),
            with_sign(flag >> 1, (byte(2) << 8) + byte(3)),
        )
    }
}

/// Emits the flags, x and y arrays of a simple glyph. Flags are not
/// run-length packed.
fn encode_points(points: &[Point], overlap: bool, out: &mut Vec<u8>) -> Result<(), DecodeError> {
    let mut flag_bytes = Vec::with_capacity(points.len());
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let (mut last_x, mut last_y) = (0i32, 0i32);

    for (i, p) in points.iter().enumerate() {
        let mut flag = if p.on_curve { FLAG_ON_CURVE } else { 0 };
        if i == 0 && overlap {
            flag |= FLAG_OVERLAP_SIMPLE;
        }
        let dx = p.x - last_x;
        let dy = p.y - last_y;
        last_x = p.x;
        last_y = p.y;

        flag |= encode_delta(dx, FLAG_X_SHORT, FLAG_X_SAME_OR_POSITIVE, &mut xs)?;
        flag |= encode_delta(dy, FLAG_Y_SHORT, FLAG_Y_SAME_OR_POSITIVE, &mut ys)?;
        flag_bytes.push(flag);
    }

    out.extend_from_slice(&flag_bytes);
    out.extend_from_slice(&xs);
    out.extend_from_slice(&ys);
    Ok(())
}

fn encode_delta(delta: i32, short: u8, same_or_positive: u8, out: &mut Vec<u8>) -> Result<u8, DecodeError> {
    if delta == 0 {
        Ok(same_or_positive)
    } else if (-255..=255).contains(&delta) {
        out.push(delta.unsigned_abs() as u8);
        Ok(if delta > 0 { short | same_or_positive } else { short })
    } else {
        out.extend_from_slice(&coord(delta)?.to_be_bytes());
        Ok(0)
    }
}

fn encode_loca(offsets: &[usize], index_format: u16) -> Result<Vec<u8>, DecodeError> {
    let mut loca = Vec::with_capacity(offsets.len() * if index_format == 0 { 2 } else { 4 });
    for &offset in offsets {
        if index_format == 0 {
            let half = u16::try_from(offset / 2)
                .map_err(|_| DecodeError::Malformed("glyf too large for short loca".into()))?;
            loca.extend_from_slice(&half.to_be_bytes());
        } else {
            let long = u32::try_from(offset)
                .map_err(|_| DecodeError::Malformed("glyf too large for long loca".into()))?;
            loca.extend_from_slice(&long.to_be_bytes());
        }
    }
    Ok(loca)
}
