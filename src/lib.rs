//! Polar code construction, Fast-SSC and SCL decoding.
//!
//! ```text
//! construct(N, K, snr) -> frozen set
//!       |
//!       v
//! Encoder::new(frozen, systematic).encode(info) -> codeword
//!       |
//!       v  (channel, LLRs in)
//! FastSscDecoder / SclDecoder / DepthFirstDecoder / AdaptiveDecoder
//! ```

pub mod bits;
pub mod construct;
pub mod decode;
pub mod detector;
pub mod encode;
pub mod error;
pub mod frozen;
pub mod params;
pub mod pool;
pub mod trace_init;
pub mod tree;

pub use construct::construct;
pub use decode::{build_decoder, Decoder, DecoderParams, DecoderVariant};
pub use encode::{Encoder, Systematic};
pub use error::PolarError;
pub use frozen::FrozenSet;
pub use params::CodeParams;
