//! The Fast-SSC decoder: a single pass over the compressed tree.

use super::{build_tree_for, decode_tree, extract_info_bits, pack_bool_vec, Decoder, TreeNode};
use crate::detector::ErrorDetector;
use crate::error::{NotConfiguredSnafu, PolarError, SizeMismatchSnafu};
use crate::params::CodeParams;
use crate::pool::Pool;
use snafu::ensure;

/// A Fast Simplified Successive Cancellation decoder for one code instance.
///
/// The tree is built once, at construction, from the code's frozen set and
/// reused for every `decode()` call; only the scratch pool and the input
/// buffer change between decodes.
pub struct FastSscDecoder {
    params: CodeParams,
    tree: TreeNode,
    pool: Pool<f32>,
    input: Vec<f32>,
    detector: Option<Box<dyn ErrorDetector>>,
    configured: bool,
    last_info_bits: Vec<bool>,
}

impl FastSscDecoder {
    pub fn new(params: CodeParams, detector: Option<Box<dyn ErrorDetector>>) -> Self {
        let tree = build_tree_for(params.frozen());
        let n = params.block_length();
        Self {
            params,
            tree,
            pool: Pool::new(),
            input: vec![0.0; n],
            detector,
            configured: false,
            last_info_bits: Vec::new(),
        }
    }

    pub fn block_length(&self) -> usize {
        self.params.block_length()
    }

    /// Run the tree recursion and return the decoded codeword bits (`x̂`,
    /// not yet reduced to information bits). Exposed so the depth-first
    /// redecoder and the SCL L=1 equivalence test can drive a bare decode.
    pub fn decode_codeword(&self) -> Vec<bool> {
        let mut output = vec![false; self.params.block_length()];
        decode_tree(&self.tree, &self.input, &mut output, &self.pool);
        output
    }
}

impl Decoder for FastSscDecoder {
    fn set_signal_f32(&mut self, llr: &[f32]) -> Result<(), PolarError> {
        ensure!(
            llr.len() == self.params.block_length(),
            SizeMismatchSnafu { expected: self.params.block_length(), actual: llr.len() }
        );
        self.input.copy_from_slice(llr);
        self.configured = true;
        Ok(())
    }

    fn set_signal_i8(&mut self, llr: &[i8]) -> Result<(), PolarError> {
        ensure!(
            llr.len() == self.params.block_length(),
            SizeMismatchSnafu { expected: self.params.block_length(), actual: llr.len() }
        );
        for (dst, &src) in self.input.iter_mut().zip(llr) {
            *dst = src as f32;
        }
        self.configured = true;
        Ok(())
    }

    fn decode(&mut self) -> Result<bool, PolarError> {
        ensure!(self.configured, NotConfiguredSnafu);
        let codeword = self.decode_codeword();
        self.last_info_bits = extract_info_bits(codeword, self.params.frozen(), self.params.systematic());
        let ok = match &self.detector {
            Some(det) => det.verify(&self.last_info_bits),
            None => true,
        };
        tracing::trace!(n = self.params.block_length(), ok, "fast-ssc decode complete");
        Ok(ok)
    }

    fn info_bits_packed(&self) -> Vec<u8> {
        pack_bool_vec(&self.last_info_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::construct;
    use crate::detector::NoDetector;

    fn bpsk(bits: &[bool]) -> Vec<f32> {
        bits.iter().map(|&b| if b { -1.0 } else { 1.0 }).collect()
    }

    #[test]
    fn round_trip_n8_k4_scenario_1() {
        // spec.md section 8, scenario 1: info 0b1010 (packed 0xA0), N=8 K=4.
        let frozen = construct(8, 4, 0.0).unwrap();
        let enc = crate::encode::Encoder::new(frozen.clone(), crate::encode::Systematic::No);
        let info = vec![true, false, true, false];
        let codeword = enc.encode(&info).unwrap();
        let llr = bpsk(&codeword);

        let params = CodeParams::new(frozen, 0.0, false);
        let mut dec = FastSscDecoder::new(params, Some(Box::new(NoDetector)));
        dec.set_signal_f32(&llr).unwrap();
        assert!(dec.decode().unwrap());
        assert_eq!(dec.info_bits_packed(), vec![0b1010_0000]);
    }

    #[test]
    fn systematic_round_trip_does_not_need_retransform() {
        let frozen = construct(16, 8, 2.0).unwrap();
        let enc = crate::encode::Encoder::new(frozen.clone(), crate::encode::Systematic::Yes);
        let info: Vec<bool> = (0..8).map(|i| i % 2 == 0).collect();
        let codeword = enc.encode(&info).unwrap();
        let llr = bpsk(&codeword);

        let params = CodeParams::new(frozen, 2.0, true);
        let mut dec = FastSscDecoder::new(params, None);
        dec.set_signal_f32(&llr).unwrap();
        assert!(dec.decode().unwrap());

        let mut expected = vec![0u8; 1];
        for (i, &b) in info.iter().enumerate() {
            if b {
                expected[0] |= 1 << (7 - i);
            }
        }
        assert_eq!(dec.info_bits_packed(), expected);
    }

    #[test]
    fn decode_before_set_signal_errors() {
        let frozen = construct(8, 4, 0.0).unwrap();
        let params = CodeParams::new(frozen, 0.0, false);
        let mut dec = FastSscDecoder::new(params, None);
        assert!(matches!(dec.decode(), Err(PolarError::NotConfigured)));
    }

    #[test]
    fn negating_all_llrs_flips_every_non_frozen_output_bit() {
        // spec.md section 8 invariant: sign-flip symmetry.
        let frozen = construct(16, 8, 1.0).unwrap();
        let enc = crate::encode::Encoder::new(frozen.clone(), crate::encode::Systematic::No);
        let info: Vec<bool> = (0..8).map(|i| i % 3 == 0).collect();
        let codeword = enc.encode(&info).unwrap();
        let llr = bpsk(&codeword);
        let flipped: Vec<f32> = llr.iter().map(|&x| -x).collect();

        let params = CodeParams::new(frozen.clone(), 1.0, false);
        let mut a = FastSscDecoder::new(params.clone(), None);
        a.set_signal_f32(&llr).unwrap();
        a.decode().unwrap();
        let out_a = a.decode_codeword();

        let mut b = FastSscDecoder::new(params, None);
        b.set_signal_f32(&flipped).unwrap();
        b.decode().unwrap();
        let out_b = b.decode_codeword();

        for i in 0..16 {
            if !frozen.is_frozen(i) {
                assert_ne!(out_a[i], out_b[i], "bit {i} should flip under global sign negation");
            }
        }
    }
}
