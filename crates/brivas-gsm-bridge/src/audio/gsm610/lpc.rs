//! LPC analysis, section 4.2.4 to 4.2.7
//!
//! Produces the eight coded log-area ratios of a 160-sample block. The
//! block is rescaled in place by the autocorrelation step and the rounding
//! of that rescale is carried into the short-term filter.

use super::arith::{abs, add, div, mult, mult_r, norm};
use super::tables::{A, B, MAC, MIC};

pub(super) fn analysis(s: &mut [i16; 160]) -> [i16; 8] {
    let l_acf = autocorrelation(s);
    let mut lar = reflection_coefficients(&l_acf);
    to_log_area_ratios(&mut lar);
    quantize(&mut lar);
    lar
}

fn autocorrelation(s: &mut [i16; 160]) -> [i32; 9] {
    let smax = s.iter().map(|&x| abs(x)).max().unwrap_or(0);
    let scalauto = if smax == 0 {
        0
    } else {
        4 - norm((smax as i32) << 16)
    };

    if scalauto > 0 {
        let factor = 16384 >> (scalauto - 1);
        for x in s.iter_mut() {
            *x = mult_r(*x, factor);
        }
    }

    let mut l_acf = [0i32; 9];
    for (k, acf) in l_acf.iter_mut().enumerate() {
        for i in k..160 {
            *acf = acf.wrapping_add(s[i] as i32 * s[i - k] as i32);
        }
        *acf <<= 1;
    }

    if scalauto > 0 {
        for x in s.iter_mut() {
            *x = ((*x as i32) << scalauto) as i16;
        }
    }
    l_acf
}

/// Schur recursion
fn reflection_coefficients(l_acf: &[i32; 9]) -> [i16; 8] {
    let mut r = [0i16; 8];
    if l_acf[0] == 0 {
        return r;
    }

    let temp = norm(l_acf[0]);
    let mut acf = [0i16; 9];
    for (a, l) in acf.iter_mut().zip(l_acf) {
        *a = ((*l << temp) >> 16) as i16;
    }

    let mut p = acf;
    let mut k = [0i16; 9];
    k[1..8].copy_from_slice(&acf[1..8]);

    for n in 1..=8 {
        let temp = abs(p[1]);
        if p[0] < temp {
            // remaining coefficients stay zero
            return r;
        }
        let mut rn = div(temp, p[0]);
        if p[1] > 0 {
            rn = -rn;
        }
        r[n - 1] = rn;
        if n == 8 {
            break;
        }

        p[0] = add(p[0], mult_r(p[1], rn));
        for m in 1..=8 - n {
            p[m] = add(p[m + 1], mult_r(k[m], rn));
            k[m] = add(k[m], mult_r(p[m + 1], rn));
        }
    }
    r
}

fn to_log_area_ratios(r: &mut [i16; 8]) {
    for x in r.iter_mut() {
        let mut temp = abs(*x);
        if temp < 22118 {
            temp >>= 1;
        } else if temp < 31130 {
            temp -= 11059;
        } else {
            temp = (temp - 26112) << 2;
        }
        *x = if *x < 0 { -temp } else { temp };
    }
}

fn quantize(lar: &mut [i16; 8]) {
    for (i, x) in lar.iter_mut().enumerate() {
        let mut temp = mult(A[i], *x);
        temp = add(temp, B[i]);
        temp = add(temp, 256);
        temp >>= 9;
        *x = if temp > MAC[i] {
            MAC[i] - MIC[i]
        } else if temp < MIC[i] {
            0
        } else {
            temp - MIC[i]
        };
    }
}
