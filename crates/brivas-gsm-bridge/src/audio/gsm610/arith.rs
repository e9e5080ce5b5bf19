//! Fixed-point primitives of GSM 06.10
//!
//! 16-bit words with saturation, products in Q15. These must stay
//! bit-exact with the recommendation's basic operators.

pub(super) const MIN_WORD: i16 = i16::MIN;
pub(super) const MAX_WORD: i16 = i16::MAX;

#[inline]
pub(super) fn add(a: i16, b: i16) -> i16 {
    a.saturating_add(b)
}

#[inline]
pub(super) fn sub(a: i16, b: i16) -> i16 {
    a.saturating_sub(b)
}

#[inline]
pub(super) fn mult(a: i16, b: i16) -> i16 {
    if a == MIN_WORD && b == MIN_WORD {
        MAX_WORD
    } else {
        ((a as i32 * b as i32) >> 15) as i16
    }
}

#[inline]
pub(super) fn mult_r(a: i16, b: i16) -> i16 {
    if a == MIN_WORD && b == MIN_WORD {
        MAX_WORD
    } else {
        ((a as i32 * b as i32 + 16384) >> 15) as i16
    }
}

#[inline]
pub(super) fn abs(a: i16) -> i16 {
    if a == MIN_WORD {
        MAX_WORD
    } else {
        a.abs()
    }
}

#[inline]
pub(super) fn l_add(a: i32, b: i32) -> i32 {
    a.saturating_add(b)
}

/// Left shifts needed to normalize `a`; 31 for zero
pub(super) fn norm(a: i32) -> i16 {
    let a = if a < 0 {
        if a <= -1_073_741_824 {
            return 0;
        }
        !a
    } else {
        a
    };
    (a as u32).leading_zeros() as i16 - 1
}

/// Q15 division for `0 <= num <= denum`
pub(super) fn div(num: i16, denum: i16) -> i16 {
    if num == 0 {
        return 0;
    }
    let mut l_num = num as i32;
    let l_denum = denum as i32;
    let mut div: i16 = 0;
    for _ in 0..15 {
        div <<= 1;
        l_num <<= 1;
        if l_num >= l_denum {
            l_num -= l_denum;
            div += 1;
        }
    }
    div
}

pub(super) fn asl(a: i16, n: i16) -> i16 {
    if n >= 16 {
        return 0;
    }
    if n <= -16 {
        return if a < 0 { -1 } else { 0 };
    }
    if n < 0 {
        return asr(a, -n);
    }
    ((a as i32) << n) as i16
}

pub(super) fn asr(a: i16, n: i16) -> i16 {
    if n >= 16 {
        return if a < 0 { -1 } else { 0 };
    }
    if n <= -16 {
        return 0;
    }
    if n < 0 {
        return ((a as i32) << -n) as i16;
    }
    a >> n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturation() {
        assert_eq!(add(MAX_WORD, 1), MAX_WORD);
        assert_eq!(sub(MIN_WORD, 1), MIN_WORD);
        assert_eq!(mult(MIN_WORD, MIN_WORD), MAX_WORD);
        assert_eq!(mult_r(MIN_WORD, MIN_WORD), MAX_WORD);
        assert_eq!(abs(MIN_WORD), MAX_WORD);
        assert_eq!(l_add(i32::MAX, 1), i32::MAX);
    }

    #[test]
    fn test_products() {
        assert_eq!(mult(16384, 16384), 8192);
        assert_eq!(mult_r(32767, 4096), 4096);
        assert_eq!(mult_r(3277, 4), 0);
    }

    #[test]
    fn test_norm() {
        assert_eq!(norm(0), 31);
        assert_eq!(norm(1), 30);
        assert_eq!(norm(0x4000_0000), 0);
        assert_eq!(norm(0x2000_0000), 1);
        assert_eq!(norm(-1), 31);
        assert_eq!(norm(-1_073_741_824), 0);
    }

    #[test]
    fn test_div() {
        assert_eq!(div(0, 100), 0);
        assert_eq!(div(1, 2), 16384);
        assert_eq!(div(100, 100), 32767);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(asl(1, 9), 512);
        assert_eq!(asl(1, -1), 0);
        assert_eq!(asr(4608, 10), 4);
        assert_eq!(asr(-1, 20), -1);
        assert_eq!(asl(-5, -20), -1);
    }
}
