//! Big-endian cursor over font data.

use super::DecodeError;

pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Reader<'a> {
    /// `what` names the structure being read, for error messages.
    pub(crate) fn new(data: &'a [u8], what: &'static str) -> Self {
        Self { data, pos: 0, what }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Bytes consumed since `start`.
    pub(crate) fn since(&self, start: usize) -> &'a [u8] {
        &self.data[start..self.pos]
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated(self.what));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.bytes(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn i16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.u16()? as i16)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// WOFF2 `255UInt16`.
    pub(crate) fn u255_16(&mut self) -> Result<u16, DecodeError> {
        const WORD_CODE: u8 = 253;
        const ONE_MORE_BYTE_CODE2: u8 = 254;
        const ONE_MORE_BYTE_CODE1: u8 = 255;
        const LOWEST_U_CODE: u16 = 253;
        Ok(match self.u8()? {
            WORD_CODE => self.u16()?,
            ONE_MORE_BYTE_CODE1 => u16::from(self.u8()?) + LOWEST_U_CODE,
            ONE_MORE_BYTE_CODE2 => u16::from(self.u8()?) + LOWEST_U_CODE * 2,
            code => u16::from(code),
        })
    }

    /// WOFF2 `UIntBase128`: at most 5 bytes, no leading zeros, fits in u32.
    pub(crate) fn base128(&mut self) -> Result<u32, DecodeError> {
        let mut acc: u32 = 0;
        for i in 0..5 {
            let b = self.u8()?;
            if i == 0 && b == 0x80 {
                return Err(DecodeError::Malformed("UIntBase128 with leading zero".into()));
            }
            if acc & 0xFE00_0000 != 0 {
                return Err(DecodeError::Malformed("UIntBase128 overflows u32".into()));
            }
            acc = (acc << 7) | u32::from(b & 0x7F);
            if b & 0x80 == 0 {
                return Ok(acc);
            }
        }
        Err(DecodeError::Malformed("UIntBase128 longer than 5 bytes".into()))
    }
}
