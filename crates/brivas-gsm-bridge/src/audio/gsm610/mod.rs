//! GSM 06.10 full-rate speech codec
//!
//! Bit-exact fixed-point implementation of the RPE-LTP coder. One encoder
//! turns 160 linear samples into a 33-octet frame, one decoder does the
//! reverse. Both carry filter state across frames, so each direction of a
//! call owns its own instance.

mod arith;
mod frame;
mod long_term;
mod lpc;
mod rpe;
mod short_term;
mod tables;

pub use frame::{FRAME_LEN, MAGIC};

use crate::errors::CodecError;
use arith::{add, l_add, mult_r};
use frame::{FrameParams, SubframeParams};
use short_term::LarHistory;

/// Samples in one frame (20 ms at 8 kHz)
pub const SAMPLES_PER_FRAME: usize = 160;

/// Residual history plus the block being encoded
const ENCODER_HISTORY: usize = 280;
/// Residual history plus the subframe being decoded
const DECODER_HISTORY: usize = 160;

fn zeroed(len: usize) -> Result<Vec<i16>, CodecError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| CodecError::Allocation)?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Speech encoder state
#[derive(Debug, Clone)]
pub struct Encoder {
    z1: i16,
    l_z2: i32,
    mp: i16,
    u: [i16; 8],
    lar: LarHistory,
    dp0: Vec<i16>,
}

impl Encoder {
    pub fn new() -> Result<Self, CodecError> {
        Ok(Self {
            z1: 0,
            l_z2: 0,
            mp: 0,
            u: [0; 8],
            lar: LarHistory::default(),
            dp0: zeroed(ENCODER_HISTORY)?,
        })
    }

    /// Encode one frame of linear samples
    pub fn encode(&mut self, samples: &[i16; SAMPLES_PER_FRAME]) -> [u8; FRAME_LEN] {
        let mut so = self.preprocess(samples);
        let mut params = FrameParams {
            larc: lpc::analysis(&mut so),
            ..Default::default()
        };
        self.lar.analysis(&params.larc, &mut self.u, &mut so);

        for (k, sub) in params.sub.iter_mut().enumerate() {
            let base = 120 + 40 * k;
            let mut e = [0i16; 40];
            let mut dpp = [0i16; 40];
            let (nc, bc) =
                long_term::predict(&so[40 * k..40 * k + 40], &self.dp0, base, &mut e, &mut dpp);
            let excitation = rpe::encode(&mut e);
            for i in 0..40 {
                self.dp0[base + i] = add(e[i], dpp[i]);
            }
            *sub = SubframeParams {
                nc,
                bc,
                mc: excitation.mc,
                xmaxc: excitation.xmaxc,
                xmc: excitation.xmc,
            };
        }
        self.dp0.copy_within(160..280, 0);

        params.pack()
    }

    /// Downscaling, offset compensation and pre-emphasis
    fn preprocess(&mut self, samples: &[i16; SAMPLES_PER_FRAME]) -> [i16; SAMPLES_PER_FRAME] {
        let mut so = [0i16; SAMPLES_PER_FRAME];
        for (out, &s) in so.iter_mut().zip(samples) {
            let scaled = (s >> 3) << 2;
            let s1 = scaled - self.z1;
            self.z1 = scaled;

            let msp = (self.l_z2 >> 15) as i16;
            let lsp = self.l_z2.wrapping_sub((msp as i32) << 15) as i16;
            let l_s2 = ((s1 as i32) << 15) + mult_r(lsp, 32735) as i32;
            self.l_z2 = l_add(msp as i32 * 32735, l_s2);

            let l_temp = l_add(self.l_z2, 16384);
            let msp = mult_r(self.mp, -28180);
            self.mp = (l_temp >> 15) as i16;
            *out = add(self.mp, msp);
        }
        so
    }
}

/// Speech decoder state
#[derive(Debug, Clone)]
pub struct Decoder {
    v: [i16; 9],
    lar: LarHistory,
    nrp: i16,
    msr: i16,
    drp0: Vec<i16>,
}

impl Decoder {
    pub fn new() -> Result<Self, CodecError> {
        Ok(Self {
            v: [0; 9],
            lar: LarHistory::default(),
            nrp: 40,
            msr: 0,
            drp0: zeroed(DECODER_HISTORY)?,
        })
    }

    /// Decode one 33-octet frame into linear samples
    pub fn decode(&mut self, frame: &[u8]) -> Result<[i16; SAMPLES_PER_FRAME], CodecError> {
        let params = FrameParams::unpack(frame)?;

        let mut wt = [0i16; SAMPLES_PER_FRAME];
        for (j, sub) in params.sub.iter().enumerate() {
            let erp = rpe::decode(sub.xmaxc, sub.mc, &sub.xmc);
            long_term::synthesize(&mut self.nrp, sub.nc, sub.bc, &erp, &mut self.drp0);
            wt[40 * j..40 * j + 40].copy_from_slice(&self.drp0[120..160]);
        }

        let mut s = self.lar.synthesis(&params.larc, &mut self.v, &wt);
        for x in s.iter_mut() {
            let tmp = mult_r(self.msr, 28180);
            self.msr = add(*x, tmp);
            *x = add(self.msr, self.msr) & !7;
        }
        Ok(s)
    }
}
