//! The tree compressor: folds a subtree's frozen-bit layout into one of the
//! nine specialized node tags.
//!
//! This mirrors `FastSscAvx::createDecoder`'s count-based dispatch rather
//! than `PolarCode::pcc()`'s separate bottom-up tag array -- the former is
//! what the reference decoder actually builds its tree from, and it turns
//! out to be exactly the count-only classification spec.md describes:
//! `Rep`/`Spc` only ever depend on how many of a subtree's bits are frozen,
//! never on which ones.

/// A compressed-tree node tag. See spec.md section 3 for the invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTag {
    Zero,
    One,
    Rep,
    Spc,
    Half,
    ZeroR,
    ROne,
    ZeroSpc,
    Generic,
}

/// Classify a subtree of the given length given the *local* (subtree-
/// relative, `0..length`) sorted frozen bit indices within it.
///
/// `ZeroR`/`ROne`/`ZeroSpc` are only considered for subtrees longer than 8;
/// at length 8 or below the reference decoder always falls back to its
/// "short" generic node regardless of structure, so classification there
/// stops at `Generic` (see spec.md section 4.4, "a *short* generic node").
pub fn classify(length: usize, local_frozen: &[usize]) -> NodeTag {
    let k = local_frozen.len();

    if k == length {
        return NodeTag::Zero;
    }
    if k == 0 {
        return NodeTag::One;
    }
    if length == 2 {
        // The only remaining case at length 2 is k == 1: one frozen, one
        // information bit. Repetition-of-1 and single-parity-check coincide
        // here, and spec.md gives this its own tag and leaf kernel.
        return NodeTag::Half;
    }
    if k == length - 1 {
        return NodeTag::Rep;
    }
    if k == 1 {
        return NodeTag::Spc;
    }
    if length <= 8 {
        return NodeTag::Generic;
    }

    let half = length / 2;
    let (left, right) = split_frozen(local_frozen, half);

    if left.len() == half && right.len() == 1 {
        NodeTag::ZeroSpc
    } else if right.is_empty() {
        NodeTag::ROne
    } else if left.len() == half {
        NodeTag::ZeroR
    } else {
        NodeTag::Generic
    }
}

/// Split a subtree-local frozen index list at `half`, rebasing the right
/// half to `0..half`. Equivalent to the reference's `splitFrozenBits`.
pub fn split_frozen(local_frozen: &[usize], half: usize) -> (Vec<usize>, Vec<usize>) {
    let split_at = local_frozen.partition_point(|&b| b < half);
    let left = local_frozen[..split_at].to_vec();
    let right = local_frozen[split_at..].iter().map(|&b| b - half).collect();
    (left, right)
}
