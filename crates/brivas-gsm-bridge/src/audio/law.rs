//! G.711 line encoding for the voice transport
//!
//! Bit-exact with the ITU-T STL reference: A-law uses the 13 most
//! significant bits of the sample, mu-law the 14 most significant bits.

use crate::types::Law;

/// A-law compression of one linear sample
pub fn alaw_compress(sample: i16) -> u8 {
    let mut ix = if sample < 0 {
        (((!sample) as u16) >> 4) as i16
    } else {
        sample >> 4
    };

    if ix > 15 {
        let mut iexp = 1;
        while ix > 16 + 15 {
            ix >>= 1;
            iexp += 1;
        }
        ix -= 16;
        ix += iexp << 4;
    }

    if sample >= 0 {
        ix |= 0x0080;
    }

    (ix ^ 0x0055) as u8
}

/// A-law expansion of one octet
pub fn alaw_expand(compressed: u8) -> i16 {
    let ix = ((compressed ^ 0x55) & 0x7f) as i16;
    let iexp = ix >> 4;
    let mut mant = ix & 0x0f;

    if iexp > 0 {
        mant += 16;
    }
    mant = (mant << 4) + 0x0008;
    if iexp > 1 {
        mant <<= iexp - 1;
    }

    if compressed > 127 {
        mant
    } else {
        -mant
    }
}

/// mu-law compression of one linear sample
pub fn ulaw_compress(sample: i16) -> u8 {
    let absno = if sample < 0 {
        (((!sample) as u16) >> 2) as i16 + 33
    } else {
        (sample >> 2) + 33
    };
    let absno = absno.min(0x1fff);

    let mut i = absno >> 6;
    let mut segno = 1;
    while i != 0 {
        segno += 1;
        i >>= 1;
    }

    let high_nibble = 0x0008 - segno;
    let low_nibble = 0x000f - ((absno >> segno) & 0x000f);
    let mut result = (high_nibble << 4) | low_nibble;
    if sample >= 0 {
        result |= 0x0080;
    }
    result as u8
}

/// mu-law expansion of one octet
pub fn ulaw_expand(compressed: u8) -> i16 {
    let sign = if compressed < 0x80 { -1 } else { 1 };
    let mantissa = (!compressed) as i16;
    let exponent = (mantissa >> 4) & 0x07;
    let segment = exponent + 1;
    let mantissa = mantissa & 0x0f;
    let step = 4 << segment;

    sign * ((0x0080 << exponent) + step * mantissa + step / 2 - 4 * 33)
}

/// Lookup tables for one line encoding, built once per voice channel
#[derive(Clone)]
pub struct LawTables {
    law: Law,
    expand: [i16; 256],
}

impl LawTables {
    pub fn new(law: Law) -> Self {
        let mut expand = [0i16; 256];
        for (octet, sample) in expand.iter_mut().enumerate() {
            *sample = match law {
                Law::Alaw => alaw_expand(octet as u8),
                Law::Ulaw => ulaw_expand(octet as u8),
            };
        }
        Self { law, expand }
    }

    pub fn law(&self) -> Law {
        self.law
    }

    #[inline]
    pub fn to_linear(&self, octet: u8) -> i16 {
        self.expand[octet as usize]
    }

    #[inline]
    pub fn to_law(&self, sample: i16) -> u8 {
        match self.law {
            Law::Alaw => alaw_compress(sample),
            Law::Ulaw => ulaw_compress(sample),
        }
    }
}

impl std::fmt::Debug for LawTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LawTables").field("law", &self.law).finish()
    }
}
