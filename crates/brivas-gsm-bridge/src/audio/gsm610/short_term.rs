//! Short-term analysis and synthesis filtering, section 4.2.8 to 4.2.10
//! and 4.3.3

use super::arith::{add, mult_r, sub, MAX_WORD, MIN_WORD};
use super::tables::{B, INVA, MIC};

/// Interpolation segments of a block as (start, len)
const SEGMENTS: [(usize, usize); 4] = [(0, 13), (13, 14), (27, 13), (40, 120)];

/// Decoded LARs of the current and previous block
#[derive(Debug, Clone, Default)]
pub(super) struct LarHistory {
    larpp: [[i16; 8]; 2],
    j: usize,
}

impl LarHistory {
    /// Reflection coefficients for each interpolation segment of a block
    fn coefficients(&mut self, larc: &[i16; 8]) -> [[i16; 8]; 4] {
        let cur = self.j;
        self.j ^= 1;
        self.larpp[cur] = decode_lar(larc);
        let prev = self.larpp[self.j];
        let cur = self.larpp[cur];

        let mut rp = [[0i16; 8]; 4];
        for i in 0..8 {
            rp[0][i] = add(add(prev[i] >> 2, cur[i] >> 2), prev[i] >> 1);
            rp[1][i] = add(prev[i] >> 1, cur[i] >> 1);
            rp[2][i] = add(add(prev[i] >> 2, cur[i] >> 2), cur[i] >> 1);
            rp[3][i] = cur[i];
        }
        for segment in rp.iter_mut() {
            larp_to_rp(segment);
        }
        rp
    }

    /// Filter `s` in place through the analysis lattice
    pub(super) fn analysis(&mut self, larc: &[i16; 8], u: &mut [i16; 8], s: &mut [i16; 160]) {
        let rp = self.coefficients(larc);
        for (&(start, len), rp) in SEGMENTS.iter().zip(&rp) {
            analysis_filter(u, rp, &mut s[start..start + len]);
        }
    }

    /// Reconstruct speech from the residual `wt` through the synthesis lattice
    pub(super) fn synthesis(
        &mut self,
        larc: &[i16; 8],
        v: &mut [i16; 9],
        wt: &[i16; 160],
    ) -> [i16; 160] {
        let rrp = self.coefficients(larc);
        let mut sr = [0i16; 160];
        for (&(start, len), rrp) in SEGMENTS.iter().zip(&rrp) {
            let range = start..start + len;
            synthesis_filter(v, rrp, &wt[range.clone()], &mut sr[range]);
        }
        sr
    }
}

fn decode_lar(larc: &[i16; 8]) -> [i16; 8] {
    let mut larpp = [0i16; 8];
    for i in 0..8 {
        let mut temp = add(larc[i], MIC[i]) << 10;
        temp = sub(temp, B[i] << 1);
        temp = mult_r(INVA[i], temp);
        larpp[i] = add(temp, temp);
    }
    larpp
}

fn larp_to_rp(larp: &mut [i16; 8]) {
    for x in larp.iter_mut() {
        let temp = if *x == MIN_WORD { MAX_WORD } else { x.abs() };
        let rp = if temp < 11059 {
            temp << 1
        } else if temp < 20070 {
            temp + 11059
        } else {
            add(temp >> 2, 26112)
        };
        *x = if *x < 0 { -rp } else { rp };
    }
}

fn analysis_filter(u: &mut [i16; 8], rp: &[i16; 8], s: &mut [i16]) {
    for sample in s.iter_mut() {
        let mut di = *sample;
        let mut sav = di;
        for i in 0..8 {
            let ui = u[i];
            let rpi = rp[i];
            u[i] = sav;
            sav = add(ui, mult_r(rpi, di));
            di = add(di, mult_r(rpi, ui));
        }
        *sample = di;
    }
}

fn synthesis_filter(v: &mut [i16; 9], rrp: &[i16; 8], wt: &[i16], sr: &mut [i16]) {
    for (out, &w) in sr.iter_mut().zip(wt) {
        let mut sri = w;
        for i in (0..8).rev() {
            sri = sub(sri, mult_r(rrp[i], v[i]));
            v[i + 1] = add(v[i], mult_r(rrp[i], sri));
        }
        v[0] = sri;
        *out = sri;
    }
}
