//! Decoders: Fast-SSC, SCL, depth-first redecoder, and the adaptive wrapper.
//!
//! Shared by all of them: the compressed decoding tree (built once from a
//! [`FrozenSet`] at decoder construction, reused across every `decode()`
//! call) and the F/G/combine kernels that walk it. Fast-SSC and SCL both
//! recurse over the same [`TreeNode`] shape; SCL just carries `L` copies of
//! the state instead of one.

pub mod adaptive;
pub mod depth_first;
pub mod fastssc;
pub mod scl;

use crate::bits::{bit_at, packed_len, set_bit_at};
use crate::encode::transform;
use crate::error::PolarError;
use crate::frozen::FrozenSet;
use crate::params::CodeParams;
use crate::tree::{classify, split_frozen, NodeTag};

pub use adaptive::AdaptiveDecoder;
pub use depth_first::DepthFirstDecoder;
pub use fastssc::FastSscDecoder;
pub use scl::SclDecoder;

/// Which decoding algorithm a [`DecoderParams`] configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderVariant {
    FastSsc,
    Scl(usize),
    DepthFirst(usize),
    Adaptive(usize),
}

/// Decoder-wide configuration, independent of the algorithm chosen.
///
/// `detector_factory` is a factory rather than a single boxed instance
/// because [`AdaptiveDecoder`] needs two independent detector instances (one
/// per inner decoder) and `Box<dyn ErrorDetector>` has no `Clone` bound;
/// holding an `Rc<dyn Fn() -> Box<dyn ErrorDetector>>` lets [`build_decoder`]
/// call it as many times as the chosen variant needs.
#[derive(Clone)]
pub struct DecoderParams {
    pub variant: DecoderVariant,
    pub soft_output: bool,
    pub detector_factory: Option<std::rc::Rc<dyn Fn() -> Box<dyn crate::detector::ErrorDetector>>>,
}

impl Default for DecoderParams {
    fn default() -> Self {
        Self { variant: DecoderVariant::FastSsc, soft_output: false, detector_factory: None }
    }
}

impl DecoderParams {
    fn build_detector(&self) -> Option<Box<dyn crate::detector::ErrorDetector>> {
        self.detector_factory.as_ref().map(|f| f())
    }
}

/// `decoder.new(N, frozen_set, variant, params) -> D` (spec.md section 6):
/// build whichever decoder `decoder_params.variant` names, sharing the same
/// [`CodeParams`] and detector factory across the dispatch.
pub fn build_decoder(code_params: CodeParams, decoder_params: DecoderParams) -> Box<dyn Decoder> {
    match decoder_params.variant {
        DecoderVariant::FastSsc => {
            Box::new(FastSscDecoder::new(code_params, decoder_params.build_detector()))
        }
        DecoderVariant::Scl(l) => {
            Box::new(SclDecoder::new(code_params, l, decoder_params.build_detector()))
        }
        DecoderVariant::DepthFirst(trial_limit) => {
            Box::new(DepthFirstDecoder::new(code_params, trial_limit, decoder_params.build_detector()))
        }
        DecoderVariant::Adaptive(l) => Box::new(AdaptiveDecoder::new(code_params, l, move || decoder_params.build_detector())),
    }
}

/// The common surface every decoding algorithm exposes.
pub trait Decoder {
    fn set_signal_f32(&mut self, llr: &[f32]) -> Result<(), PolarError>;
    fn set_signal_i8(&mut self, llr: &[i8]) -> Result<(), PolarError>;
    fn decode(&mut self) -> Result<bool, PolarError>;
    fn info_bits_packed(&self) -> Vec<u8>;
}

/// The precomputed, immutable shape of a compressed decoding tree (spec.md
/// section 3, "simplified-tree labelling"). Shared read-only by every
/// decode; rebuilding it per-decode would repeat the same classification
/// work for no reason, so it's built once in the owning decoder's
/// constructor and borrowed by every `decode()` call.
#[derive(Debug, Clone)]
pub enum TreeNode {
    Leaf(NodeTag, usize),
    ZeroR(usize, Box<TreeNode>),
    ROne(usize, Box<TreeNode>),
    ZeroSpc(usize),
    Generic(usize, Box<TreeNode>, Box<TreeNode>),
}

impl TreeNode {
    pub fn length(&self) -> usize {
        match self {
            TreeNode::Leaf(_, n) => *n,
            TreeNode::ZeroR(n, _) => *n,
            TreeNode::ROne(n, _) => *n,
            TreeNode::ZeroSpc(n) => *n,
            TreeNode::Generic(n, _, _) => *n,
        }
    }
}

/// Build the compressed tree for a subtree of `length` whose frozen bits
/// (subtree-local indices) are `local_frozen`.
pub fn build_tree(length: usize, local_frozen: &[usize]) -> TreeNode {
    let tag = classify(length, local_frozen);
    match tag {
        NodeTag::Zero | NodeTag::One | NodeTag::Rep | NodeTag::Spc | NodeTag::Half => {
            TreeNode::Leaf(tag, length)
        }
        NodeTag::ZeroR => {
            let half = length / 2;
            let (_, right) = split_frozen(local_frozen, half);
            TreeNode::ZeroR(length, Box::new(build_tree(half, &right)))
        }
        NodeTag::ROne => {
            let half = length / 2;
            let (left, _) = split_frozen(local_frozen, half);
            TreeNode::ROne(length, Box::new(build_tree(half, &left)))
        }
        NodeTag::ZeroSpc => TreeNode::ZeroSpc(length),
        NodeTag::Generic => {
            let half = length / 2;
            let (left, right) = split_frozen(local_frozen, half);
            TreeNode::Generic(length, Box::new(build_tree(half, &left)), Box::new(build_tree(half, &right)))
        }
    }
}

pub fn build_tree_for(frozen: &FrozenSet) -> TreeNode {
    let n = frozen.block_length();
    build_tree(n, frozen.indices())
}

/// `sign(a)*sign(b)*min(|a|,|b|)` (spec.md section 4.4, F-function).
#[inline]
pub fn f_function(a: f32, b: f32) -> f32 {
    a.signum() * b.signum() * a.abs().min(b.abs())
}

/// `b + (1-2u)*a` (spec.md section 4.4, G-function), `u` as a hard bit.
#[inline]
pub fn g_function(a: f32, b: f32, u: bool) -> f32 {
    if u {
        b - a
    } else {
        b + a
    }
}

/// `hard(x) = 1 if x < 0 else 0`; ties (`x == 0`, including `-0.0`) choose 0.
#[inline]
pub fn hard_bit(x: f32) -> bool {
    x < 0.0
}

/// Hard-decide every LLR, then flip the lowest-magnitude position if parity
/// is odd (spec.md section 4.4, SPC leaf kernel).
pub fn decode_spc(input: &[f32]) -> Vec<bool> {
    let mut bits: Vec<bool> = input.iter().map(|&x| hard_bit(x)).collect();
    let parity = bits.iter().fold(false, |acc, &b| acc ^ b);
    if parity {
        let mut best = (0usize, f32::INFINITY);
        for (i, &x) in input.iter().enumerate() {
            if x.abs() < best.1 {
                best = (i, x.abs());
            }
        }
        bits[best.0] = !bits[best.0];
    }
    bits
}

/// Walk the compressed tree, propagating LLRs down and hard-bit decisions
/// back up via the F/G/combine recursion (spec.md section 4.4).
pub fn decode_tree(node: &TreeNode, input: &[f32], output: &mut [bool], pool: &crate::pool::Pool<f32>) {
    match node {
        TreeNode::Leaf(tag, length) => decode_leaf(*tag, &input[..*length], &mut output[..*length]),
        TreeNode::ZeroR(length, right) => {
            let half = length / 2;
            let mut right_llr = pool.allocate(half);
            for i in 0..half {
                right_llr[i] = input[i] + input[i + half];
            }
            decode_tree(right, &right_llr, &mut output[half..2 * half], pool);
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
            decode_tree(left, &left_llr, &mut output[..half], pool);
            for i in 0..half {
                let u = output[i];
                let g = g_function(input[i], input[i + half], u);
                let r = hard_bit(g);
                output[half + i] = r;
                output[i] = u ^ r;
            }
        }
        TreeNode::ZeroSpc(length) => {
            let half = length / 2;
            let mut right_llr = pool.allocate(half);
            for i in 0..half {
                right_llr[i] = input[i] + input[i + half];
            }
            let right_bits = decode_spc(&right_llr);
            output[..half].copy_from_slice(&right_bits);
            output[half..2 * half].copy_from_slice(&right_bits);
        }
        TreeNode::Generic(length, left, right) => {
            let half = length / 2;
            let mut left_llr = pool.allocate(half);
            for i in 0..half {
                left_llr[i] = f_function(input[i], input[i + half]);
            }
            decode_tree(left, &left_llr, &mut output[..half], pool);

            let mut right_llr = pool.allocate(half);
            for i in 0..half {
                right_llr[i] = g_function(input[i], input[i + half], output[i]);
            }
            decode_tree(right, &right_llr, &mut output[half..2 * half], pool);

            for i in 0..half {
                output[i] ^= output[half + i];
            }
        }
    }
}

pub(crate) fn decode_leaf(tag: NodeTag, input: &[f32], output: &mut [bool]) {
    match tag {
        NodeTag::Zero => output.iter_mut().for_each(|b| *b = false),
        NodeTag::One => {
            for (o, &i) in output.iter_mut().zip(input) {
                *o = hard_bit(i);
            }
        }
        NodeTag::Rep => {
            let s: f32 = input.iter().sum();
            let bit = hard_bit(s);
            output.iter_mut().for_each(|b| *b = bit);
        }
        NodeTag::Half => {
            let bit = hard_bit(input[0] + input[1]);
            output[0] = bit;
            output[1] = bit;
        }
        NodeTag::Spc => output.copy_from_slice(&decode_spc(input)),
        NodeTag::ZeroR | NodeTag::ROne | NodeTag::ZeroSpc | NodeTag::Generic => {
            unreachable!("non-leaf tag {tag:?} passed to decode_leaf: compressor bug")
        }
    }
}

/// Turn a decoded root-level bit vector (the tree's combined output, i.e.
/// the estimated codeword `x̂`) into the information bits.
///
/// Non-systematic codes store the message in the *pre-transform* domain, so
/// recovering it means re-applying the self-inverse Arikan transform
/// (`u = x̂ · G` since `G = G⁻¹`, spec.md section 4.8) before reading off the
/// non-frozen positions. Systematic codes already carry the message bits
/// verbatim at their positions in `x̂`.
pub fn extract_info_bits(mut bits: Vec<bool>, frozen: &FrozenSet, systematic: bool) -> Vec<bool> {
    if !systematic {
        transform(&mut bits);
    }
    (0..bits.len()).filter(|&i| !frozen.is_frozen(i)).map(|i| bits[i]).collect()
}

pub fn pack_bool_vec(bits: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; packed_len(bits.len())];
    for (i, &b) in bits.iter().enumerate() {
        set_bit_at(&mut out, i, b);
    }
    out
}

pub(crate) fn unpack_bool_vec(bytes: &[u8], n: usize) -> Vec<bool> {
    (0..n).map(|i| bit_at(bytes, i)).collect()
}

#[cfg(test)]
mod factory_tests {
    use super::*;
    use crate::construct::construct;
    use crate::detector::Crc8Detector;
    use crate::encode::{Encoder, Systematic};

    fn bpsk(bits: &[bool]) -> Vec<f32> {
        bits.iter().map(|&b| if b { -1.0 } else { 1.0 }).collect()
    }

    #[test]
    fn build_decoder_dispatches_on_variant() {
        let frozen = construct(16, 8, 1.0).unwrap();
        let enc = Encoder::new(frozen.clone(), Systematic::No);
        let info: Vec<bool> = (0..8).map(|i| i % 2 == 0).collect();
        let llr = bpsk(&enc.encode(&info).unwrap());

        for variant in [
            DecoderVariant::FastSsc,
            DecoderVariant::Scl(4),
            DecoderVariant::DepthFirst(2),
            DecoderVariant::Adaptive(2),
        ] {
            let params = DecoderParams { variant, soft_output: false, detector_factory: None };
            let mut dec = build_decoder(CodeParams::new(frozen.clone(), 1.0, false), params);
            dec.set_signal_f32(&llr).unwrap();
            assert!(dec.decode().unwrap());
        }
    }

    #[test]
    fn build_decoder_shares_detector_factory_across_adaptive_inner_decoders() {
        let frozen = construct(32, 16, 2.0).unwrap();
        let params = DecoderParams {
            variant: DecoderVariant::Adaptive(2),
            soft_output: false,
            detector_factory: Some(std::rc::Rc::new(|| Box::new(Crc8Detector::new()) as Box<dyn crate::detector::ErrorDetector>)),
        };
        let mut dec = build_decoder(CodeParams::new(frozen.clone(), 2.0, false), params);
        let message: Vec<bool> = (0..8).map(|i| i % 2 == 0).collect();
        let crc = Crc8Detector::new();
        let full_info = crc.append(&message);
        let enc = Encoder::new(frozen, Systematic::No);
        let llr = bpsk(&enc.encode(&full_info).unwrap());
        dec.set_signal_f32(&llr).unwrap();
        assert!(dec.decode().unwrap());
    }
}
