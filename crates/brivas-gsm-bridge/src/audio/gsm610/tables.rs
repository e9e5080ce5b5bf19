//! Constant tables of GSM 06.10

/// LAR quantization slope, table 4.1
pub(super) const A: [i16; 8] = [20480, 20480, 20480, 20480, 13964, 15360, 8534, 9036];
/// LAR quantization offset, table 4.1
pub(super) const B: [i16; 8] = [0, 0, 2048, -2560, 94, -1792, -341, -1144];
/// Smallest coded LAR, table 4.1
pub(super) const MIC: [i16; 8] = [-32, -32, -16, -16, -8, -8, -4, -4];
/// Largest coded LAR, table 4.1
pub(super) const MAC: [i16; 8] = [31, 31, 15, 15, 7, 7, 3, 3];
/// Inverse of A, table 4.2
pub(super) const INVA: [i16; 8] = [13107, 13107, 13107, 13107, 19223, 17476, 31454, 29708];

/// LTP gain decision levels, table 4.3a
pub(super) const DLB: [i16; 4] = [6554, 16384, 26214, 32767];
/// LTP gain quantization levels, table 4.3b
pub(super) const QLB: [i16; 4] = [3277, 11469, 21299, 32767];

/// Weighting filter impulse response, table 4.4
pub(super) const H: [i16; 11] = [-134, -374, 0, 2054, 5741, 8192, 5741, 2054, 0, -374, -134];

/// Inverse mantissa, table 4.5
pub(super) const NRFAC: [i16; 8] = [29128, 26215, 23832, 21846, 20165, 18725, 17476, 16384];
/// Normalized mantissa, table 4.6
pub(super) const FAC: [i16; 8] = [18431, 20479, 22527, 24575, 26623, 28671, 30719, 32767];

/// Bits per coded LAR
pub(super) const LAR_BITS: [u32; 8] = [6, 6, 5, 5, 4, 4, 3, 3];
