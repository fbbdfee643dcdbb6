//! Adaptive wrapper: Fast-SSC first, fall back to SCL on CRC failure.

use super::{Decoder, FastSscDecoder, SclDecoder};
use crate::detector::ErrorDetector;
use crate::error::PolarError;
use crate::params::CodeParams;

/// Runs the fast decoder first; if it fails (and the list decoder has more
/// than one path to offer), delegates to the list decoder (spec.md section
/// 4.7). Both share the same input, set once via `set_signal_*`.
pub struct AdaptiveDecoder {
    fast: FastSscDecoder,
    list: SclDecoder,
    l: usize,
    used_list: bool,
}

impl AdaptiveDecoder {
    pub fn new(params: CodeParams, l: usize, detector_factory: impl Fn() -> Option<Box<dyn ErrorDetector>>) -> Self {
        let fast = FastSscDecoder::new(params.clone(), detector_factory());
        let list = SclDecoder::new(params, l, detector_factory());
        Self { fast, list, l, used_list: false }
    }

    /// Whether the most recent `decode()` had to fall back to the list
    /// decoder.
    pub fn used_list_decoder(&self) -> bool {
        self.used_list
    }
}

impl Decoder for AdaptiveDecoder {
    fn set_signal_f32(&mut self, llr: &[f32]) -> Result<(), PolarError> {
        self.fast.set_signal_f32(llr)?;
        self.list.set_signal_f32(llr)
    }

    fn set_signal_i8(&mut self, llr: &[i8]) -> Result<(), PolarError> {
        self.fast.set_signal_i8(llr)?;
        self.list.set_signal_i8(llr)
    }

    fn decode(&mut self) -> Result<bool, PolarError> {
        let fast_ok = self.fast.decode()?;
        if fast_ok || self.l <= 1 {
            self.used_list = false;
            return Ok(fast_ok);
        }
        tracing::debug!(l = self.l, "fast-ssc failed detector, falling back to list decoder");
        self.used_list = true;
        self.list.decode()
    }

    fn info_bits_packed(&self) -> Vec<u8> {
        if self.used_list {
            self.list.info_bits_packed()
        } else {
            self.fast.info_bits_packed()
        }
    }
}
