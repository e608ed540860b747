//! Audio transcoding between the telephony codec and linear PCM.
//!
//! Telephony media streams carry 8 kHz, 8-bit G.711 μ-law audio while the
//! speech services work with 16-bit linear PCM. This module converts between
//! the two representations:
//!
//! - [`decode_to_pcm`]: μ-law bytes → little-endian PCM (twice the length)
//! - [`encode_from_pcm`]: little-endian PCM → μ-law bytes (half the length)

mod mulaw;

pub use mulaw::{
    MULAW_BIAS, MULAW_CLIP, decode_sample, decode_samples, decode_to_pcm, encode_from_pcm,
    encode_sample, encode_samples,
};

/// Telephony sample rate in Hz.
pub const TELEPHONY_SAMPLE_RATE: u32 = 8000;
