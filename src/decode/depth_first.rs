//! Depth-first reliability-driven redecoder.
//!
//! Ported from the reference's `Manager`/`Configuration` scaffolding
//! (`depth_first.cpp`): decode once, and if the CRC rejects the result,
//! retry with the single least-reliable leaf's decision swapped for its
//! runner-up, from least reliable to most, up to a trial budget.

use super::{decode_leaf, f_function, g_function, hard_bit, pack_bool_vec, Decoder};
use crate::detector::ErrorDetector;
use crate::error::{NotConfiguredSnafu, PolarError, SizeMismatchSnafu};
use crate::params::CodeParams;
use crate::pool::Pool;
use crate::tree::NodeTag;
use snafu::ensure;

use super::{build_tree_for, extract_info_bits, TreeNode};

/// A leaf whose decision the redecoder may swap for its runner-up.
#[derive(Debug, Clone)]
struct Site {
    offset: usize,
    len: usize,
    reliability: f32,
    alternate: Vec<bool>,
}

/// Decode the whole tree once, writing `output` as usual, and collect a
/// [`Site`] for every Rate-1/Repetition/SPC/Half leaf encountered (spec.md
/// section 4.6). Mirrors `decode_tree`'s recursion exactly; the only
/// difference is the side channel of recorded sites.
fn decode_collect(node: &TreeNode, input: &[f32], output: &mut [bool], offset: usize, pool: &Pool<f32>, sites: &mut Vec<Site>) {
    match node {
        TreeNode::Leaf(tag, len) => {
            decode_leaf(*tag, &input[..*len], &mut output[..*len]);
            match tag {
                NodeTag::One => {
                    let (idx, mag) = argmin_abs(&input[..*len]);
                    let mut alt = output[..*len].to_vec();
                    alt[idx] = !alt[idx];
                    sites.push(Site { offset, len: *len, reliability: mag, alternate: alt });
                }
                NodeTag::Rep | NodeTag::Half => {
                    let s: f32 = input[..*len].iter().sum();
                    let alt = vec![!hard_bit(s); *len];
                    sites.push(Site { offset, len: *len, reliability: s.abs(), alternate: alt });
                }
                NodeTag::Spc => {
                    let (reliability, alt) = spc_alternate(&input[..*len], &output[..*len]);
                    sites.push(Site { offset, len: *len, reliability, alternate: alt });
                }
                NodeTag::Zero => {}
                _ => unreachable!("non-leaf tag passed to decode_collect leaf arm"),
            }
        }
        TreeNode::ZeroR(length, right) => {
            let half = length / 2;
            let mut right_llr = pool.allocate(half);
            for i in 0..half {
                right_llr[i] = input[i] + input[i + half];
            }
            decode_collect(right, &right_llr, &mut output[half..2 * half], offset + half, pool, sites);
            for i in 0..half {
                output[i] = output[half + i];
            }
        }
        TreeNode::ROne(length, left) => {
            let half = length / 2;
            let mut left_llr = pool.allocate(half);
            for i in 0..half {
                left_llr[i] = f_function(input[i], input[i + half]);
            }
            decode_collect(left, &left_llr, &mut output[..half], offset, pool, sites);

            let mut g = vec![0.0f32; half];
            for i in 0..half {
                let u = output[i];
                g[i] = g_function(input[i], input[i + half], u);
            }
            let (idx, mag) = argmin_abs(&g);
            for i in 0..half {
                let r = hard_bit(g[i]);
                output[half + i] = r;
                output[i] ^= r;
            }
            let mut alt = (0..half).map(|i| hard_bit(g[i])).collect::<Vec<_>>();
            alt[idx] = !alt[idx];
            sites.push(Site { offset: offset + half, len: half, reliability: mag, alternate: alt });
        }
        TreeNode::ZeroSpc(length) => {
            let half = length / 2;
            let mut right_llr = pool.allocate(half);
            for i in 0..half {
                right_llr[i] = input[i] + input[i + half];
            }
            let spc_bits = super::decode_spc(&right_llr);
            output[..half].copy_from_slice(&spc_bits);
            output[half..2 * half].copy_from_slice(&spc_bits);
            let (reliability, alt) = spc_alternate(&right_llr, &spc_bits);
            sites.push(Site { offset: offset + half, len: half, reliability, alternate: alt });
        }
        TreeNode::Generic(length, left, right) => {
            let half = length / 2;
            let mut left_llr = pool.allocate(half);
            for i in 0..half {
                left_llr[i] = f_function(input[i], input[i + half]);
            }
            decode_collect(left, &left_llr, &mut output[..half], offset, pool, sites);

            let mut right_llr = pool.allocate(half);
            for i in 0..half {
                right_llr[i] = g_function(input[i], input[i + half], output[i]);
            }
            decode_collect(right, &right_llr, &mut output[half..2 * half], offset + half, pool, sites);

            for i in 0..half {
                output[i] ^= output[half + i];
            }
        }
    }
}

fn argmin_abs(x: &[f32]) -> (usize, f32) {
    let mut best = (0usize, f32::INFINITY);
    for (i, &v) in x.iter().enumerate() {
        if v.abs() < best.1 {
            best = (i, v.abs());
        }
    }
    best
}

/// The SPC leaf's two lowest-magnitude even-parity-consistent candidates,
/// shared with the SCL decoder's own `fork_spc` (spec.md section 4.6's
/// reliability rule is stated in terms of the exact same two candidates).
fn spc_alternate(input: &[f32], decided: &[bool]) -> (f32, Vec<bool>) {
    let len = input.len();
    let mut idx: Vec<usize> = (0..len).collect();
    idx.sort_by(|&a, &b| input[a].abs().partial_cmp(&input[b].abs()).unwrap());

    let parity_was_odd = input.iter().map(|&x| hard_bit(x)).fold(false, |acc, b| acc ^ b);
    if parity_was_odd {
        let mut alt = decided.to_vec();
        alt[idx[0]] = !alt[idx[0]];
        alt[idx[1]] = !alt[idx[1]];
        (input[idx[1]].abs(), alt)
    } else {
        let mut alt = decided.to_vec();
        alt[idx[0]] = !alt[idx[0]];
        alt[idx[1]] = !alt[idx[1]];
        (input[idx[0]].abs(), alt)
    }
}

/// Re-decode the whole tree, but force the leaf at `(offset, len)` to
/// `forced` instead of letting its kernel decide, per spec.md section 4.6's
/// "re-decode from the root for simplicity and correctness".
fn decode_with_override(node: &TreeNode, input: &[f32], output: &mut [bool], offset: usize, pool: &Pool<f32>, force_offset: usize, forced: &[bool]) {
    let len = node.length();
    if offset == force_offset && len == forced.len() {
        output[..len].copy_from_slice(forced);
        return;
    }
    match node {
        TreeNode::Leaf(tag, len) => decode_leaf(*tag, &input[..*len], &mut output[..*len]),
        TreeNode::ZeroR(length, right) => {
            let half = length / 2;
            let mut right_llr = pool.allocate(half);
            for i in 0..half {
                right_llr[i] = input[i] + input[i + half];
            }
            decode_with_override(right, &right_llr, &mut output[half..2 * half], offset + half, pool, force_offset, forced);
            for i in 0..half {
                output[i] = output[half + i];
            }
        }
        TreeNode::ROne(length, left) => {
            let half = length / 2;
            let mut left_llr = pool.allocate(half);
            for i in 0..half {
                left_llr[i] = f_function(input[i], input[i + half]);
            }
            decode_with_override(left, &left_llr, &mut output[..half], offset, pool, force_offset, forced);
            if offset + half == force_offset && half == forced.len() {
                output[half..2 * half].copy_from_slice(forced);
                for i in 0..half {
                    output[i] ^= output[half + i];
                }
            } else {
                for i in 0..half {
                    let u = output[i];
                    let g = g_function(input[i], input[i + half], u);
                    let r = hard_bit(g);
                    output[half + i] = r;
                    output[i] = u ^ r;
                }
            }
        }
        TreeNode::ZeroSpc(length) => {
            let half = length / 2;
            if offset + half == force_offset && half == forced.len() {
                output[..half].copy_from_slice(forced);
                output[half..2 * half].copy_from_slice(forced);
            } else {
                let mut right_llr = pool.allocate(half);
                for i in 0..half {
                    right_llr[i] = input[i] + input[i + half];
                }
                let bits = super::decode_spc(&right_llr);
                output[..half].copy_from_slice(&bits);
                output[half..2 * half].copy_from_slice(&bits);
            }
        }
        TreeNode::Generic(length, left, right) => {
            let half = length / 2;
            let mut left_llr = pool.allocate(half);
            for i in 0..half {
                left_llr[i] = f_function(input[i], input[i + half]);
            }
            decode_with_override(left, &left_llr, &mut output[..half], offset, pool, force_offset, forced);

            let mut right_llr = pool.allocate(half);
            for i in 0..half {
                right_llr[i] = g_function(input[i], input[i + half], output[i]);
            }
            decode_with_override(right, &right_llr, &mut output[half..2 * half], offset + half, pool, force_offset, forced);

            for i in 0..half {
                output[i] ^= output[half + i];
            }
        }
    }
}

/// The Fast-SSC decoder with reliability-driven retry on CRC failure.
pub struct DepthFirstDecoder {
    params: CodeParams,
    tree: TreeNode,
    pool: Pool<f32>,
    input: Vec<f32>,
    trial_limit: usize,
    detector: Option<Box<dyn ErrorDetector>>,
    configured: bool,
    last_info_bits: Vec<bool>,
}

impl DepthFirstDecoder {
    pub fn new(params: CodeParams, trial_limit: usize, detector: Option<Box<dyn ErrorDetector>>) -> Self {
        let tree = build_tree_for(params.frozen());
        let n = params.block_length();
        Self { params, tree, pool: Pool::new(), input: vec![0.0; n], trial_limit, detector, configured: false, last_info_bits: Vec::new() }
    }

    fn passes(&self, codeword: &[bool]) -> Option<Vec<bool>> {
        let info = extract_info_bits(codeword.to_vec(), self.params.frozen(), self.params.systematic());
        match &self.detector {
            Some(det) if det.verify(&info) => Some(info),
            Some(_) => None,
            None => Some(info),
        }
    }
}

impl Decoder for DepthFirstDecoder {
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
        let n = self.params.block_length();

        let mut codeword = vec![false; n];
        let mut sites = Vec::new();
        decode_collect(&self.tree, &self.input, &mut codeword, 0, &self.pool, &mut sites);

        if let Some(info) = self.passes(&codeword) {
            self.last_info_bits = info;
            return Ok(true);
        }

        if self.detector.is_none() {
            // No detector configured: the first pass can never "fail", so no
            // retry is meaningful.
            self.last_info_bits = extract_info_bits(codeword, self.params.frozen(), self.params.systematic());
            return Ok(true);
        }

        tracing::debug!(sites = sites.len(), trial_limit = self.trial_limit, "first pass failed crc, retrying");
        sites.sort_by(|a, b| a.reliability.partial_cmp(&b.reliability).unwrap());

        let total_reliability: f32 = sites.iter().map(|s| s.reliability).sum();
        let mut best_codeword = codeword.clone();
        let mut best_score = f32::NEG_INFINITY;

        for (trial_index, site) in sites.iter().take(self.trial_limit).enumerate() {
            let mut trial = vec![false; n];
            decode_with_override(&self.tree, &self.input, &mut trial, 0, &self.pool, site.offset, &site.alternate);

            if let Some(info) = self.passes(&trial) {
                tracing::debug!(trial_index, "retry recovered crc-valid codeword");
                self.last_info_bits = info;
                return Ok(true);
            }

            let score = total_reliability - site.reliability;
            if score > best_score {
                best_score = score;
                best_codeword = trial;
            }
        }

        tracing::debug!("exhausted trial budget without a crc-valid codeword");
        self.last_info_bits = extract_info_bits(best_codeword, self.params.frozen(), self.params.systematic());
        Ok(false)
    }

    fn info_bits_packed(&self) -> Vec<u8> {
        pack_bool_vec(&self.last_info_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::construct;
    use crate::detector::{Crc32Detector, Crc8Detector};
    use crate::encode::{Encoder, Systematic};
    use crate::frozen::FrozenSet;

    fn bpsk(bits: &[bool]) -> Vec<f32> {
        bits.iter().map(|&b| if b { -1.0 } else { 1.0 }).collect()
    }

    #[test]
    fn clean_signal_passes_on_first_try() {
        let frozen = construct(32, 16, 3.0).unwrap();
        let enc = Encoder::new(frozen.clone(), Systematic::No);
        let info: Vec<bool> = (0..16).map(|i| i % 4 == 0).collect();
        let crc = Crc8Detector::new();
        // Encoder's K already accounts for the CRC being part of the message
        // the caller chooses to embed; here we just check plain recovery.
        let codeword = enc.encode(&info).unwrap();
        let llr = bpsk(&codeword);

        let mut dec = DepthFirstDecoder::new(CodeParams::new(frozen, 3.0, false), 2, None);
        dec.set_signal_f32(&llr).unwrap();
        assert!(dec.decode().unwrap());
        let _ = crc; // constructed to document intent; unused without a configured detector here
    }

    #[test]
    fn retries_after_single_spc_leaf_error_scenario_6() {
        // spec.md section 8, scenario 6: a single frozen bit makes the whole
        // block one SPC leaf. The first pass's uncorrected (parity-even) hard
        // decision is wrong at exactly the two lowest-reliability positions;
        // with trial_limit=2 the redecoder's one site for that leaf has a
        // runner-up that flips precisely those two back, recovering the
        // original information exactly.
        let frozen = FrozenSet::from_sorted(64, vec![23]);
        let info_len = frozen.info_length();
        let crc = Crc32Detector::new();
        let message_len = info_len - crc.check_bits();
        let message: Vec<bool> = (0..message_len).map(|i| i % 5 == 0).collect();
        let info = crc.append(&message);

        let enc = Encoder::new(frozen.clone(), Systematic::No);
        let codeword = enc.encode(&info).unwrap();
        let mut llr = bpsk(&codeword);
        llr[0] = if codeword[0] { 1.0 } else { -1.0 };
        llr[1] = if codeword[1] { 1.5 } else { -1.5 };

        let mut dec = DepthFirstDecoder::new(CodeParams::new(frozen, 4.0, false), 2, Some(Box::new(Crc32Detector::new())));
        dec.set_signal_f32(&llr).unwrap();
        assert!(dec.decode().unwrap());
        assert_eq!(dec.info_bits_packed(), pack_bool_vec(&info));
    }
}
