//! Arikan transform encoder: non-systematic and systematic.
//!
//! Ports `PolarCode::encode()`/`transform()`: an in-place butterfly over
//! `log2(N)` levels, bit-reversal folded into the construction's frozen-set
//! indexing rather than applied at encode time (spec.md section 4.8 keeps
//! information bits in natural, not bit-reversed, order at the public
//! boundary, matching the reference's `bitreversed_slow` pre-pass).

use crate::error::{PolarError, SizeMismatchSnafu};
use crate::frozen::FrozenSet;
use snafu::ensure;

/// Whether the encoder produces a systematic codeword (information bits
/// appear verbatim at their original positions in the output) or the
/// non-systematic Arikan transform of the frozen+information vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Systematic {
    No,
    Yes,
}

/// A configured polar encoder for one `(N, frozen set)` pair.
#[derive(Debug, Clone)]
pub struct Encoder {
    frozen: FrozenSet,
    systematic: Systematic,
}

impl Encoder {
    pub fn new(frozen: FrozenSet, systematic: Systematic) -> Self {
        Self { frozen, systematic }
    }

    pub fn block_length(&self) -> usize {
        self.frozen.block_length()
    }

    pub fn info_length(&self) -> usize {
        self.frozen.info_length()
    }

    pub fn frozen_set(&self) -> &FrozenSet {
        &self.frozen
    }

    /// Encode `info` (one bit per byte-free `bool`, one entry per
    /// information bit, in ascending index order) into a length-`N` codeword.
    pub fn encode(&self, info: &[bool]) -> Result<Vec<bool>, PolarError> {
        ensure!(
            info.len() == self.info_length(),
            SizeMismatchSnafu { expected: self.info_length(), actual: info.len() }
        );

        let n = self.block_length();
        let mut u = vec![false; n];
        let mut cursor = 0usize;
        for i in 0..n {
            if !self.frozen.is_frozen(i) {
                u[i] = info[cursor];
                cursor += 1;
            }
        }

        let mut codeword = u.clone();
        transform(&mut codeword);

        if self.systematic == Systematic::Yes {
            make_systematic(&mut codeword, &self.frozen);
        }

        Ok(codeword)
    }

    /// `E.encode(info_bits_packed) -> codeword_packed` (spec.md section 6):
    /// big-endian-packed information bytes in, big-endian-packed codeword
    /// bytes out. `info_bytes` must hold exactly `ceil(K/8)` bytes, with any
    /// trailing padding bits in the last byte ignored.
    pub fn encode_packed(&self, info_bytes: &[u8]) -> Result<Vec<u8>, PolarError> {
        let expected = (self.info_length() + 7) / 8;
        ensure!(info_bytes.len() == expected, SizeMismatchSnafu { expected, actual: info_bytes.len() });
        let info = crate::decode::unpack_bool_vec(info_bytes, self.info_length());
        let codeword = self.encode(&info)?;
        Ok(crate::decode::pack_bool_vec(&codeword))
    }
}

/// The Arikan butterfly transform, in place: `x <- x * F^(x)n`, `F = [[1,0],[1,1]]`.
pub fn transform(x: &mut [bool]) {
    let n = x.len();
    debug_assert!(n.is_power_of_two());
    let mut stride = 1usize;
    while stride < n {
        let mut start = 0usize;
        while start < n {
            for i in start..start + stride {
                x[i] ^= x[i + stride];
            }
            start += stride * 2;
        }
        stride *= 2;
    }
}

/// Systematic encoding via the Arikan "encode twice, re-freeze" method: apply
/// the transform, zero the frozen positions back out, transform again. The
/// fixed points of this process are exactly the systematic codewords (Arikan,
/// "Systematic Polar Coding", 2011) -- ported from the same identity the
/// reference's `SystematicEncoder` exploits via two `transform()` passes.
fn make_systematic(codeword: &mut [bool], frozen: &FrozenSet) {
    for &i in frozen.indices() {
        codeword[i] = false;
    }
    transform(codeword);
    for &i in frozen.indices() {
        codeword[i] = false;
    }
    transform(codeword);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::construct;

    #[test]
    fn encode_packed_matches_bit_level_encode() {
        // spec.md section 8, scenario 1: info 0b1010 packed as 0xA0, N=8 K=4.
        let frozen = construct(8, 4, 0.0).unwrap();
        let enc = Encoder::new(frozen, Systematic::No);
        let info = vec![true, false, true, false];
        let expected = enc.encode(&info).unwrap();

        let packed = enc.encode_packed(&[0xA0]).unwrap();
        let mut expected_packed = vec![0u8; 1];
        for (i, &b) in expected.iter().enumerate() {
            if b {
                expected_packed[0] |= 1 << (7 - i);
            }
        }
        assert_eq!(packed, expected_packed);
    }

    #[test]
    fn encode_packed_rejects_wrong_byte_length() {
        let frozen = construct(8, 4, 0.0).unwrap();
        let enc = Encoder::new(frozen, Systematic::No);
        assert!(enc.encode_packed(&[0xA0, 0x00]).is_err());
    }

    #[test]
    fn rejects_wrong_info_length() {
        let frozen = construct(8, 4, 0.0).unwrap();
        let enc = Encoder::new(frozen, Systematic::No);
        assert!(enc.encode(&[true, false]).is_err());
    }

    #[test]
    fn transform_is_its_own_inverse() {
        let mut x = vec![true, false, true, true, false, false, true, false];
        let original = x.clone();
        transform(&mut x);
        transform(&mut x);
        assert_eq!(x, original);
    }

    #[test]
    fn non_systematic_all_zero_info_is_all_zero_codeword() {
        let frozen = construct(8, 4, 0.0).unwrap();
        let enc = Encoder::new(frozen, Systematic::No);
        let codeword = enc.encode(&[false, false, false, false]).unwrap();
        assert!(codeword.iter().all(|&b| !b));
    }

    #[test]
    fn systematic_codeword_information_bits_pass_through() {
        let frozen = construct(16, 8, 0.0).unwrap();
        let enc = Encoder::new(frozen.clone(), Systematic::Yes);
        let info = vec![true, false, true, true, false, true, false, false];
        let codeword = enc.encode(&info).unwrap();

        let mut cursor = 0usize;
        for i in 0..16 {
            if !frozen.is_frozen(i) {
                assert_eq!(codeword[i], info[cursor], "info bit {cursor} not passed through at position {i}");
                cursor += 1;
            }
        }
    }

    #[test]
    fn non_systematic_and_systematic_differ_for_nontrivial_info() {
        let frozen = construct(16, 8, 0.0).unwrap();
        let info = vec![true, false, true, true, false, true, false, true];
        let non_sys = Encoder::new(frozen.clone(), Systematic::No).encode(&info).unwrap();
        let sys = Encoder::new(frozen, Systematic::Yes).encode(&info).unwrap();
        assert_ne!(non_sys, sys);
    }
}
