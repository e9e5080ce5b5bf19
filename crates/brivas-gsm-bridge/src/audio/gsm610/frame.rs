//! Bit layout of a 33-octet full-rate frame

use super::tables::LAR_BITS;
use crate::errors::CodecError;

/// Octets in one encoded frame
pub const FRAME_LEN: usize = 33;
/// Signature nibble opening every frame
pub const MAGIC: u8 = 0xd;

/// Parameters of one 40-sample subframe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct SubframeParams {
    pub nc: i16,
    pub bc: i16,
    pub mc: i16,
    pub xmaxc: i16,
    pub xmc: [i16; 13],
}

/// Parameters of one 160-sample frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct FrameParams {
    pub larc: [i16; 8],
    pub sub: [SubframeParams; 4],
}

struct BitWriter {
    out: [u8; FRAME_LEN],
    pos: usize,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            out: [0; FRAME_LEN],
            pos: 0,
        }
    }

    fn put(&mut self, value: u16, bits: u32) {
        for shift in (0..bits).rev() {
            if value >> shift & 1 != 0 {
                self.out[self.pos / 8] |= 0x80 >> (self.pos % 8);
            }
            self.pos += 1;
        }
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn get(&mut self, bits: u32) -> i16 {
        let mut value = 0i16;
        for _ in 0..bits {
            let bit = self.data[self.pos / 8] >> (7 - self.pos % 8) & 1;
            value = value << 1 | bit as i16;
            self.pos += 1;
        }
        value
    }
}

impl FrameParams {
    pub(super) fn pack(&self) -> [u8; FRAME_LEN] {
        let mut w = BitWriter::new();
        w.put(MAGIC as u16, 4);
        for (&lar, &bits) in self.larc.iter().zip(&LAR_BITS) {
            w.put(lar as u16, bits);
        }
        for sub in &self.sub {
            w.put(sub.nc as u16, 7);
            w.put(sub.bc as u16, 2);
            w.put(sub.mc as u16, 2);
            w.put(sub.xmaxc as u16, 6);
            for &x in &sub.xmc {
                w.put(x as u16, 3);
            }
        }
        w.out
    }

    pub(super) fn unpack(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() != FRAME_LEN {
            return Err(CodecError::FrameLength {
                expected: FRAME_LEN,
                actual: data.len(),
            });
        }
        let mut r = BitReader::new(data);
        let magic = r.get(4) as u8;
        if magic != MAGIC {
            return Err(CodecError::BadMagic(magic));
        }

        let mut params = FrameParams::default();
        for (lar, &bits) in params.larc.iter_mut().zip(&LAR_BITS) {
            *lar = r.get(bits);
        }
        for sub in params.sub.iter_mut() {
            sub.nc = r.get(7);
            sub.bc = r.get(2);
            sub.mc = r.get(2);
            sub.xmaxc = r.get(6);
            for x in sub.xmc.iter_mut() {
                *x = r.get(3);
            }
        }
        Ok(params)
    }
}
