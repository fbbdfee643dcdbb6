//! Error types for code construction, encoding and decoding.
//!
//! `DetectionFailure` (spec: a completed decode whose error detector rejected
//! the result) is deliberately *not* a variant here -- it is the ordinary
//! `false` return of `decode()`. Only configuration and construction mistakes
//! are reported as `Err`.

use snafu::Snafu;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum PolarError {
    #[snafu(display(
        "invalid code parameters: block length {n} must be a power of two >= 2, \
         and 0 < K={k} < N"
    ))]
    Construction { n: usize, k: usize },

    #[snafu(display("input length mismatch: expected {expected} elements, got {actual}"))]
    SizeMismatch { expected: usize, actual: usize },

    #[snafu(display("decode() called before set_signal()"))]
    NotConfigured,
}

pub type Result<T, E = PolarError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_display_names_the_offending_n_and_k() {
        let msg = PolarError::Construction { n: 10, k: 5 }.to_string();
        assert!(msg.contains("10"), "{msg}");
        assert!(msg.contains("5"), "{msg}");
        assert!(msg.contains("power of two"), "{msg}");
    }

    #[test]
    fn size_mismatch_display_names_expected_and_actual() {
        let msg = PolarError::SizeMismatch { expected: 64, actual: 63 }.to_string();
        assert!(msg.contains("expected 64"), "{msg}");
        assert!(msg.contains("got 63"), "{msg}");
    }

    #[test]
    fn not_configured_display_is_actionable() {
        let msg = PolarError::NotConfigured.to_string();
        assert!(msg.contains("set_signal"), "{msg}");
    }
}
