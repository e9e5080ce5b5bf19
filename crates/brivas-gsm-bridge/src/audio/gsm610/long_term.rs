//! Long-term prediction, section 4.2.11 to 4.2.12 and 4.3.2
//!
//! `dp0` holds the reconstructed short-term residual: 120 samples of
//! history followed by the subframes of the current block. `base` is the
//! index of the current subframe's first sample within it.

use super::arith::{abs, add, mult, mult_r, norm, sub};
use super::tables::{DLB, QLB};

/// Lag search range
const MIN_LAG: usize = 40;
const MAX_LAG: usize = 120;

/// Estimate lag and gain for subframe `d`, writing the residual into `e`
/// and the prediction into `dpp`. Returns `(Nc, bc)`.
pub(super) fn predict(
    d: &[i16],
    dp0: &[i16],
    base: usize,
    e: &mut [i16; 40],
    dpp: &mut [i16; 40],
) -> (i16, i16) {
    let (nc, bc) = parameters(d, dp0, base);
    let bp = QLB[bc as usize];
    let lagged = &dp0[base - nc as usize..];
    for k in 0..40 {
        dpp[k] = mult_r(bp, lagged[k]);
        e[k] = sub(d[k], dpp[k]);
    }
    (nc, bc)
}

fn parameters(d: &[i16], dp0: &[i16], base: usize) -> (i16, i16) {
    let dmax = d.iter().map(|&x| abs(x)).max().unwrap_or(0);
    let temp = if dmax == 0 {
        0
    } else {
        norm((dmax as i32) << 16)
    };
    let scal = if temp > 6 { 0 } else { 6 - temp };

    let mut wt = [0i16; 40];
    for (w, &x) in wt.iter_mut().zip(d) {
        *w = x >> scal;
    }

    let mut l_max: i32 = 0;
    let mut nc = MIN_LAG;
    for lambda in MIN_LAG..=MAX_LAG {
        let lagged = &dp0[base - lambda..base - lambda + 40];
        let l_result = wt
            .iter()
            .zip(lagged)
            .fold(0i32, |acc, (&w, &p)| acc.wrapping_add(w as i32 * p as i32));
        if l_result > l_max {
            nc = lambda;
            l_max = l_result;
        }
    }

    l_max <<= 1;
    l_max >>= 6 - scal;

    let l_power = dp0[base - nc..base - nc + 40]
        .iter()
        .map(|&x| {
            let t = (x >> 3) as i32;
            t * t
        })
        .sum::<i32>()
        << 1;

    let nc = nc as i16;
    if l_max <= 0 {
        return (nc, 0);
    }
    if l_max >= l_power {
        return (nc, 3);
    }

    let temp = norm(l_power);
    let r = ((l_max << temp) >> 16) as i16;
    let s = ((l_power << temp) >> 16) as i16;
    let bc = DLB[..3]
        .iter()
        .position(|&level| r <= mult(s, level))
        .unwrap_or(3);
    (nc, bc as i16)
}

/// Rebuild one subframe of the residual from `erp`. `drp0` holds 120
/// samples of history followed by the subframe being reconstructed.
pub(super) fn synthesize(nrp: &mut i16, ncr: i16, bcr: i16, erp: &[i16; 40], drp0: &mut [i16]) {
    let nr = if !(MIN_LAG as i16..=MAX_LAG as i16).contains(&ncr) {
        *nrp
    } else {
        ncr
    };
    *nrp = nr;

    let brp = QLB[bcr as usize & 3];
    let lag = nr as usize;
    for k in 0..40 {
        let drpp = mult_r(brp, drp0[120 + k - lag]);
        drp0[120 + k] = add(erp[k], drpp);
    }
    drp0.copy_within(40..160, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_uses_minimum_lag_and_gain() {
        let dp0 = [0i16; 280];
        let d = [0i16; 40];
        let mut e = [1i16; 40];
        let mut dpp = [1i16; 40];
        assert_eq!(predict(&d, &dp0, 120, &mut e, &mut dpp), (40, 0));
        assert!(e.iter().all(|&x| x == 0));
        assert!(dpp.iter().all(|&x| x == 0));
    }

    #[test]
    fn test_finds_pulse_lag() {
        let mut dp0 = [0i16; 280];
        dp0[63] = 8000;
        let mut d = [0i16; 40];
        d[6] = 8000;
        let mut e = [0i16; 40];
        let mut dpp = [0i16; 40];
        let (nc, bc) = predict(&d, &dp0, 120, &mut e, &mut dpp);
        assert_eq!(nc, 63);
        assert_eq!(bc, 3);
        assert_eq!(dpp[6], 8000);
        assert_eq!(e[6], 0);
    }

    #[test]
    fn test_synthesis_keeps_previous_lag_when_invalid() {
        let mut nrp = 40;
        let mut drp0 = [0i16; 160];
        let erp = [0i16; 40];
        synthesize(&mut nrp, 75, 0, &erp, &mut drp0);
        assert_eq!(nrp, 75);
        synthesize(&mut nrp, 10, 0, &erp, &mut drp0);
        assert_eq!(nrp, 75);
        synthesize(&mut nrp, 127, 0, &erp, &mut drp0);
        assert_eq!(nrp, 75);
    }

    #[test]
    fn test_synthesis_shifts_history() {
        let mut nrp = 40;
        let mut drp0 = [0i16; 160];
        let mut erp = [0i16; 40];
        erp[0] = 100;
        synthesize(&mut nrp, 40, 0, &erp, &mut drp0);
        // the new subframe now sits at the end of the history
        assert_eq!(drp0[80], 100);
        assert_eq!(drp0[120], 100);
    }
}
