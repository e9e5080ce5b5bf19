//! Regular pulse excitation, section 4.2.13 to 4.2.17 and 4.3.1

use super::arith::{abs, add, asl, asr, mult, mult_r, sub, MAX_WORD, MIN_WORD};
use super::tables::{FAC, H, NRFAC};

/// Encoded excitation of one subframe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Excitation {
    pub xmaxc: i16,
    pub mc: i16,
    pub xmc: [i16; 13],
}

/// Quantize the residual `e`, replacing it with the decoded excitation the
/// receiver will see so the encoder tracks the same history.
pub(super) fn encode(e: &mut [i16; 40]) -> Excitation {
    let x = weighting_filter(e);
    let (mc, xm) = grid_selection(&x);
    let (xmaxc, xmc) = apcm_quantize(&xm);
    *e = decode(xmaxc, mc, &xmc);
    Excitation { xmaxc, mc, xmc }
}

/// Rebuild the 40-sample excitation from its parameters
pub(super) fn decode(xmaxc: i16, mc: i16, xmc: &[i16; 13]) -> [i16; 40] {
    let (exp, mant) = xmaxc_to_exp_mant(xmaxc);
    let xmp = apcm_inverse(xmc, exp, mant);
    let mut ep = [0i16; 40];
    for (i, &v) in xmp.iter().enumerate() {
        ep[mc as usize + 3 * i] = v;
    }
    ep
}

fn weighting_filter(e: &[i16; 40]) -> [i16; 40] {
    let mut padded = [0i16; 50];
    padded[5..45].copy_from_slice(e);

    let mut x = [0i16; 40];
    for (k, out) in x.iter_mut().enumerate() {
        let l_result = H
            .iter()
            .zip(&padded[k..k + 11])
            .fold(4096i32, |acc, (&h, &v)| acc.wrapping_add(h as i32 * v as i32));
        *out = (l_result >> 13).clamp(MIN_WORD as i32, MAX_WORD as i32) as i16;
    }
    x
}

fn grid_selection(x: &[i16; 40]) -> (i16, [i16; 13]) {
    let energy = |m: usize| -> i32 {
        (0..13)
            .map(|i| {
                let t = (x[m + 3 * i] >> 2) as i32;
                t * t
            })
            .sum::<i32>()
            << 1
    };

    let mut mc = 0;
    let mut em = energy(0);
    for m in 1..4 {
        let l_result = energy(m);
        if l_result > em {
            mc = m;
            em = l_result;
        }
    }

    let mut xm = [0i16; 13];
    for (i, v) in xm.iter_mut().enumerate() {
        *v = x[mc + 3 * i];
    }
    (mc as i16, xm)
}

fn apcm_quantize(xm: &[i16; 13]) -> (i16, [i16; 13]) {
    let xmax = xm.iter().map(|&v| abs(v)).max().unwrap_or(0);

    let mut exp: i16 = 0;
    let mut temp = xmax >> 9;
    let mut itest = false;
    for _ in 0..6 {
        itest |= temp <= 0;
        temp >>= 1;
        if !itest {
            exp += 1;
        }
    }

    let xmaxc = add(xmax >> (exp + 5), exp << 3);
    let (exp, mant) = xmaxc_to_exp_mant(xmaxc);

    let shift = 6 - exp;
    let factor = NRFAC[mant as usize];
    let mut xmc = [0i16; 13];
    for (out, &v) in xmc.iter_mut().zip(xm) {
        let scaled = ((v as i32) << shift) as i16;
        *out = (mult(scaled, factor) >> 12) + 4;
    }
    (xmaxc, xmc)
}

fn xmaxc_to_exp_mant(xmaxc: i16) -> (i16, i16) {
    let mut exp = if xmaxc > 15 { (xmaxc >> 3) - 1 } else { 0 };
    let mut mant = xmaxc - (exp << 3);

    if mant == 0 {
        return (-4, 7);
    }
    while mant <= 7 {
        mant = mant << 1 | 1;
        exp -= 1;
    }
    (exp, mant - 8)
}

fn apcm_inverse(xmc: &[i16; 13], exp: i16, mant: i16) -> [i16; 13] {
    let temp1 = FAC[mant as usize];
    let temp2 = sub(6, exp);
    let temp3 = asl(1, sub(temp2, 1));

    let mut xmp = [0i16; 13];
    for (out, &c) in xmp.iter_mut().zip(xmc) {
        let temp = (((c as i32) << 1) - 7) << 12;
        let temp = mult_r(temp1, temp as i16);
        *out = asr(add(temp, temp3), temp2);
    }
    xmp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_excitation() {
        let mut e = [0i16; 40];
        let exc = encode(&mut e);
        assert_eq!(exc.xmaxc, 0);
        assert_eq!(exc.mc, 0);
        assert_eq!(exc.xmc, [4; 13]);
        // the smallest step is reconstructed on grid 0
        for (k, &v) in e.iter().enumerate() {
            assert_eq!(v, if k % 3 == 0 && k < 39 { 4 } else { 0 });
        }
    }

    #[test]
    fn test_exponent_mantissa_split() {
        assert_eq!(xmaxc_to_exp_mant(0), (-4, 7));
        assert_eq!(xmaxc_to_exp_mant(8), (0, 0));
        assert_eq!(xmaxc_to_exp_mant(1), (-3, 7));
        assert_eq!(xmaxc_to_exp_mant(63), (6, 7));
    }

    #[test]
    fn test_grid_follows_energy() {
        let mut x = [0i16; 40];
        for i in 0..13 {
            x[2 + 3 * i] = 1000;
        }
        let (mc, xm) = grid_selection(&x);
        assert_eq!(mc, 2);
        assert_eq!(xm, [1000; 13]);
    }

    #[test]
    fn test_reconstruction_keeps_sign() {
        let mut e = [0i16; 40];
        for (k, v) in e.iter_mut().enumerate() {
            *v = if k % 2 == 0 { 3000 } else { -3000 };
        }
        let exc = encode(&mut e);
        assert!(exc.xmaxc > 0);
        let rebuilt = decode(exc.xmaxc, exc.mc, &exc.xmc);
        assert_eq!(rebuilt, e);
        assert!(rebuilt.iter().any(|&v| v > 0));
        assert!(rebuilt.iter().any(|&v| v < 0));
    }
}
