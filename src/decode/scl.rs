//! Successive Cancellation List decoding.
//!
//! Runs the same compressed tree as Fast-SSC, but instead of committing to
//! one hard decision per information-bearing leaf, forks the active path set
//! and keeps the `L` lowest-penalty survivors (spec.md section 4.5). A
//! per-path stack of node-local LLR arrays (`local_in_stack`) stands in for
//! the teacher's per-node scratch block: since forking deep-copies the whole
//! path (stack included), both children of a fork automatically inherit the
//! correct ancestor context with no extra bookkeeping.
//!
//! `Rate-1`/`Repetition`/`SPC` leaves here fork bit-by-bit or block-at-a-time
//! exactly as spec.md section 4.5 describes; a wide `One` leaf (length > 1)
//! is walked one bit at a time rather than enumerated as a block, since the
//! penalty formula the spec gives is stated at length 1 and the reference's
//! own list-decoding path (`PolarCode::decodeMultiPath`) was never filled in
//! to compare against.

use super::{build_tree_for, extract_info_bits, f_function, g_function, hard_bit, pack_bool_vec, Decoder, TreeNode};
use crate::detector::ErrorDetector;
use crate::error::{NotConfiguredSnafu, PolarError, SizeMismatchSnafu};
use crate::params::CodeParams;
use crate::tree::NodeTag;
use snafu::ensure;

#[derive(Clone)]
struct SclPath {
    bits: Vec<bool>,
    metric: f64,
    seq: usize,
    local_in_stack: Vec<Vec<f32>>,
}

fn penalty_for_bit(x: f32, b: bool) -> f32 {
    if hard_bit(x) == b {
        0.0
    } else {
        x.abs()
    }
}

fn prune(paths: &mut Vec<SclPath>, l: usize) {
    paths.sort_by(|a, b| a.metric.partial_cmp(&b.metric).unwrap().then(a.seq.cmp(&b.seq)));
    paths.truncate(l);
}

fn fork_single_bit(paths: &mut Vec<SclPath>, offset: usize, local_idx: usize, l: usize, next_seq: &mut usize) {
    let mut new_paths = Vec::with_capacity(paths.len() * 2);
    for p in paths.iter() {
        let local_val = p.local_in_stack.last().expect("node context pushed by caller")[local_idx];
        for &b in &[false, true] {
            let mut np = p.clone();
            np.bits[offset] = b;
            np.metric += penalty_for_bit(local_val, b) as f64;
            np.seq = *next_seq;
            *next_seq += 1;
            new_paths.push(np);
        }
    }
    *paths = new_paths;
    prune(paths, l);
}

fn fork_block(paths: &mut Vec<SclPath>, offset: usize, len: usize, l: usize, next_seq: &mut usize) {
    let mut new_paths = Vec::with_capacity(paths.len() * 2);
    for p in paths.iter() {
        let local = p.local_in_stack.last().expect("node context pushed by caller").clone();
        for &b in &[false, true] {
            let mut np = p.clone();
            for i in 0..len {
                np.bits[offset + i] = b;
            }
            let penalty: f64 = (0..len).map(|i| penalty_for_bit(local[i], b) as f64).sum();
            np.metric += penalty;
            np.seq = *next_seq;
            *next_seq += 1;
            new_paths.push(np);
        }
    }
    *paths = new_paths;
    prune(paths, l);
}

fn fork_spc(paths: &mut Vec<SclPath>, offset: usize, len: usize, l: usize, next_seq: &mut usize) {
    let mut new_paths = Vec::with_capacity(paths.len() * 2);
    for p in paths.iter() {
        let local = p.local_in_stack.last().expect("node context pushed by caller").clone();
        let hard: Vec<bool> = local.iter().map(|&x| hard_bit(x)).collect();
        let parity = hard.iter().fold(false, |acc, &b| acc ^ b);

        let mut idx: Vec<usize> = (0..len).collect();
        idx.sort_by(|&a, &b| local[a].abs().partial_cmp(&local[b].abs()).unwrap());

        let candidates: [(Vec<bool>, f64); 2] = if !parity {
            let mut c2 = hard.clone();
            c2[idx[0]] = !c2[idx[0]];
            c2[idx[1]] = !c2[idx[1]];
            let pen2 = (local[idx[0]].abs() + local[idx[1]].abs()) as f64;
            [(hard.clone(), 0.0), (c2, pen2)]
        } else {
            let mut c1 = hard.clone();
            c1[idx[0]] = !c1[idx[0]];
            let mut c2 = hard.clone();
            c2[idx[1]] = !c2[idx[1]];
            [(c1, local[idx[0]].abs() as f64), (c2, local[idx[1]].abs() as f64)]
        };

        for (cand, pen) in candidates {
            let mut np = p.clone();
            np.bits[offset..offset + len].copy_from_slice(&cand);
            np.metric += pen;
            np.seq = *next_seq;
            *next_seq += 1;
            new_paths.push(np);
        }
    }
    *paths = new_paths;
    prune(paths, l);
}

fn decode_leaf_list(tag: NodeTag, len: usize, offset: usize, paths: &mut Vec<SclPath>, l: usize, next_seq: &mut usize) {
    match tag {
        NodeTag::Zero => {
            for p in paths.iter_mut() {
                let local = p.local_in_stack.last().expect("node context pushed by caller").clone();
                for i in 0..len {
                    p.bits[offset + i] = false;
                    p.metric += penalty_for_bit(local[i], false) as f64;
                }
            }
        }
        NodeTag::One => {
            for i in 0..len {
                fork_single_bit(paths, offset + i, i, l, next_seq);
            }
        }
        NodeTag::Half => fork_block(paths, offset, 2, l, next_seq),
        NodeTag::Rep => fork_block(paths, offset, len, l, next_seq),
        NodeTag::Spc => fork_spc(paths, offset, len, l, next_seq),
        NodeTag::ZeroR | NodeTag::ROne | NodeTag::ZeroSpc | NodeTag::Generic => {
            unreachable!("non-leaf tag {tag:?} passed to decode_leaf_list")
        }
    }
}

enum VChild<'a> {
    Real(&'a TreeNode),
    Synthetic(TreeNode),
}

impl<'a> VChild<'a> {
    fn node(&self) -> &TreeNode {
        match self {
            VChild::Real(n) => n,
            VChild::Synthetic(n) => n,
        }
    }
}

fn composite_children(node: &TreeNode) -> (usize, VChild<'_>, VChild<'_>) {
    match node {
        TreeNode::ZeroR(len, right) => {
            (*len, VChild::Synthetic(TreeNode::Leaf(NodeTag::Zero, len / 2)), VChild::Real(right))
        }
        TreeNode::ROne(len, left) => {
            (*len, VChild::Real(left), VChild::Synthetic(TreeNode::Leaf(NodeTag::One, len / 2)))
        }
        TreeNode::ZeroSpc(len) => (
            *len,
            VChild::Synthetic(TreeNode::Leaf(NodeTag::Zero, len / 2)),
            VChild::Synthetic(TreeNode::Leaf(NodeTag::Spc, len / 2)),
        ),
        TreeNode::Generic(len, left, right) => (*len, VChild::Real(left), VChild::Real(right)),
        TreeNode::Leaf(..) => unreachable!("composite_children called on a leaf"),
    }
}

fn scl_recurse(node: &TreeNode, paths: &mut Vec<SclPath>, offset: usize, l: usize, next_seq: &mut usize) {
    if let TreeNode::Leaf(tag, len) = node {
        decode_leaf_list(*tag, *len, offset, paths, l, next_seq);
        return;
    }

    let (len, left, right) = composite_children(node);
    let half = len / 2;

    for p in paths.iter_mut() {
        let local = p.local_in_stack.last().expect("node context pushed by caller");
        let mut left_in = vec![0.0f32; half];
        for i in 0..half {
            left_in[i] = f_function(local[i], local[i + half]);
        }
        p.local_in_stack.push(left_in);
    }
    scl_recurse(left.node(), paths, offset, l, next_seq);
    for p in paths.iter_mut() {
        p.local_in_stack.pop();
    }

    for p in paths.iter_mut() {
        let local = p.local_in_stack.last().expect("node context pushed by caller").clone();
        let mut right_in = vec![0.0f32; half];
        for i in 0..half {
            let u = p.bits[offset + i];
            right_in[i] = g_function(local[i], local[i + half], u);
        }
        p.local_in_stack.push(right_in);
    }
    scl_recurse(right.node(), paths, offset + half, l, next_seq);
    for p in paths.iter_mut() {
        p.local_in_stack.pop();
    }

    for p in paths.iter_mut() {
        for i in 0..half {
            p.bits[offset + i] ^= p.bits[offset + half + i];
        }
    }
}

/// Run the list recursion to completion and return every surviving path,
/// best (lowest metric) first.
fn scl_decode(tree: &TreeNode, root_llr: &[f32], l: usize) -> Vec<SclPath> {
    let n = tree.length();
    let mut paths = vec![SclPath { bits: vec![false; n], metric: 0.0, seq: 0, local_in_stack: vec![root_llr.to_vec()] }];
    let mut next_seq = 1usize;
    scl_recurse(tree, &mut paths, 0, l, &mut next_seq);
    paths.sort_by(|a, b| a.metric.partial_cmp(&b.metric).unwrap().then(a.seq.cmp(&b.seq)));
    paths
}

/// A Successive Cancellation List decoder keeping up to `L` candidate paths.
pub struct SclDecoder {
    params: CodeParams,
    tree: TreeNode,
    l: usize,
    input: Vec<f32>,
    detector: Option<Box<dyn ErrorDetector>>,
    configured: bool,
    last_info_bits: Vec<bool>,
}

impl SclDecoder {
    pub fn new(params: CodeParams, l: usize, detector: Option<Box<dyn ErrorDetector>>) -> Self {
        let tree = build_tree_for(params.frozen());
        let n = params.block_length();
        Self { params, tree, l: l.max(1), input: vec![0.0; n], detector, configured: false, last_info_bits: Vec::new() }
    }

    /// Decode and return every surviving path's bits (codeword domain),
    /// best first. Used directly by the depth-first redecoder's SCL=1
    /// equivalence and by tests inspecting more than the winning path.
    pub fn decode_paths(&self) -> Vec<Vec<bool>> {
        scl_decode(&self.tree, &self.input, self.l).into_iter().map(|p| p.bits).collect()
    }
}

impl Decoder for SclDecoder {
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
        let paths = scl_decode(&self.tree, &self.input, self.l);
        tracing::debug!(l = self.l, surviving = paths.len(), "scl decode complete");

        match &self.detector {
            None => {
                let best = paths.into_iter().next().expect("at least one path always survives");
                self.last_info_bits = extract_info_bits(best.bits, self.params.frozen(), self.params.systematic());
                Ok(true)
            }
            Some(det) => {
                for (rank, path) in paths.iter().enumerate() {
                    let info = extract_info_bits(path.bits.clone(), self.params.frozen(), self.params.systematic());
                    if det.verify(&info) {
                        tracing::trace!(rank, "scl path passed error detector");
                        self.last_info_bits = info;
                        return Ok(true);
                    }
                }
                tracing::debug!("no scl path passed error detector, falling back to best metric");
                let best = paths.into_iter().next().expect("at least one path always survives");
                self.last_info_bits = extract_info_bits(best.bits, self.params.frozen(), self.params.systematic());
                Ok(false)
            }
        }
    }

    fn info_bits_packed(&self) -> Vec<u8> {
        pack_bool_vec(&self.last_info_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::construct;
    use crate::decode::fastssc::FastSscDecoder;
    use crate::encode::{Encoder, Systematic};

    fn bpsk(bits: &[bool]) -> Vec<f32> {
        bits.iter().map(|&b| if b { -1.0 } else { 1.0 }).collect()
    }

    #[test]
    fn l1_matches_fastssc() {
        let frozen = construct(32, 16, 1.0).unwrap();
        let enc = Encoder::new(frozen.clone(), Systematic::No);
        let info: Vec<bool> = (0..16).map(|i| (i * 7) % 3 == 0).collect();
        let codeword = enc.encode(&info).unwrap();
        let llr = bpsk(&codeword);

        let mut scl = SclDecoder::new(CodeParams::new(frozen.clone(), 1.0, false), 1, None);
        scl.set_signal_f32(&llr).unwrap();
        scl.decode().unwrap();

        let mut fast = FastSscDecoder::new(CodeParams::new(frozen, 1.0, false), None);
        fast.set_signal_f32(&llr).unwrap();
        fast.decode().unwrap();

        assert_eq!(scl.info_bits_packed(), fast.info_bits_packed());
    }

    #[test]
    fn recovers_flipped_bit_scenario_2() {
        // spec.md section 8, scenario 2.
        let frozen = construct(16, 8, 5.0).unwrap();
        let enc = Encoder::new(frozen.clone(), Systematic::No);
        let info = vec![true; 8];
        let codeword = enc.encode(&info).unwrap();
        let mut llr = bpsk(&codeword);

        // Flip the weakest codeword bit: the highest-index non-frozen position.
        let flip_pos = (0..16).filter(|&i| !frozen.is_frozen(i)).max().unwrap();
        llr[flip_pos] = -llr[flip_pos] * 4.0;

        let mut dec = SclDecoder::new(CodeParams::new(frozen, 5.0, false), 4, None);
        dec.set_signal_f32(&llr).unwrap();
        assert!(dec.decode().unwrap());
        assert_eq!(dec.info_bits_packed(), vec![0xFF]);
    }

    #[test]
    fn detector_rejects_when_no_path_passes() {
        use crate::detector::Crc8Detector;
        let frozen = construct(16, 8, 5.0).unwrap();
        let mut dec = SclDecoder::new(CodeParams::new(frozen, 5.0, false), 2, Some(Box::new(Crc8Detector::new())));
        dec.set_signal_f32(&vec![5.0; 16]).unwrap();
        // All-high-confidence-zero LLRs with a CRC detector configured: the
        // decoded word is whatever the all-zero-biased tree produces, which
        // satisfies the CRC only by coincidence, so this just exercises that
        // `decode()` returns a definite boolean either way without panicking.
        let _ = dec.decode().unwrap();
    }
}
