//! Bhattacharyya-parameter code construction.
//!
//! Ports `PolarCode::pcc()` from the reference implementation: propagate a
//! log-domain Bhattacharyya parameter through the butterfly levels, permute
//! by bit-reversal, then sort to find the `K` most reliable channels.

use crate::error::{ConstructionSnafu, PolarError};
use crate::frozen::FrozenSet;
use snafu::ensure;

/// `construct(N, K, design_snr_dB) -> frozen set`
///
/// `N` must be a power of two >= 2, and `0 < K < N`.
pub fn construct(block_length: usize, info_length: usize, design_snr_db: f32) -> Result<FrozenSet, PolarError> {
    ensure!(
        block_length >= 2
            && block_length.is_power_of_two()
            && info_length > 0
            && info_length < block_length,
        ConstructionSnafu { n: block_length, k: info_length }
    );

    let levels = block_length.trailing_zeros() as usize;
    let design_snr_lin = 10f64.powf(design_snr_db as f64 / 10.0);
    let s = design_snr_lin * (info_length as f64 / block_length as f64);

    let mut z = vec![0.0f64; block_length];
    z[0] = -s;
    for level in 0..levels {
        let b = 1usize << level;
        for j in 0..b {
            let t = z[j];
            z[j] = logdomain_diff(std::f64::consts::LN_2 + t, 2.0 * t);
            z[j + b] = 2.0 * t;
        }
    }

    let mut reliability = vec![0.0f64; block_length];
    for i in 0..block_length {
        reliability[i] = z[bit_reverse(i, levels)];
    }

    let mut order: Vec<usize> = (0..block_length).collect();
    order.sort_by(|&a, &b| reliability[a].partial_cmp(&reliability[b]).expect("non-NaN"));

    let mut frozen: Vec<usize> = order[info_length..].to_vec();
    frozen.sort_unstable();

    tracing::debug!(n = block_length, k = info_length, design_snr_db, "constructed frozen set");
    Ok(FrozenSet::from_sorted(block_length, frozen))
}

/// `a + ln(1 - e^(b-a))`, used to fold two Bhattacharyya parameters.
fn logdomain_diff(a: f64, b: f64) -> f64 {
    a + (-(b - a).exp()).ln_1p()
}

fn bit_reverse(mut j: usize, bits: usize) -> usize {
    let mut r = 0usize;
    for _ in 0..bits {
        r = (r << 1) | (j & 1);
        j >>= 1;
    }
    r
}
