//! G.711 μ-law companding.
//!
//! Decoding goes through a 256-entry table computed at compile time. Encoding
//! follows the reference G.711 algorithm so the telephony endpoint decodes the
//! bytes to the same levels it would for any other standard encoder.

/// Bias added to the magnitude before the exponent search.
pub const MULAW_BIAS: i32 = 0x84;

/// Largest magnitude representable before clipping.
pub const MULAW_CLIP: i32 = 32635;

static DECODE_TABLE: [i16; 256] = build_decode_table();

const fn build_decode_table() -> [i16; 256] {
    let mut table = [0i16; 256];
    let mut i = 0;
    while i < 256 {
        let byte = !(i as u8);
        let sign = byte & 0x80;
        let exponent = ((byte >> 4) & 0x07) as i32;
        let mantissa = (byte & 0x0F) as i32;
        let magnitude = (((mantissa << 3) + MULAW_BIAS) << exponent) - MULAW_BIAS;
        table[i] = if sign != 0 {
            -magnitude as i16
        } else {
            magnitude as i16
        };
        i += 1;
    }
    table
}

/// Decode one μ-law byte into a linear sample.
#[inline]
pub fn decode_sample(byte: u8) -> i16 {
    DECODE_TABLE[byte as usize]
}

/// Encode one linear sample into a μ-law byte.
#[inline]
pub fn encode_sample(sample: i16) -> u8 {
    let mut value = sample as i32;
    let sign = if value < 0 { 0x80 } else { 0x00 };
    if value < 0 {
        value = -value;
    }
    value = value.min(MULAW_CLIP) + MULAW_BIAS;

    let mut exponent: i32 = 7;
    let mut mask: i32 = 0x4000;
    while exponent > 0 && (value & mask) == 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = (value >> (exponent + 3)) & 0x0F;

    !((sign | (exponent << 4) | mantissa) as u8)
}

/// Decode μ-law bytes into linear samples.
pub fn decode_samples(mulaw: &[u8]) -> Vec<i16> {
    mulaw.iter().map(|&b| decode_sample(b)).collect()
}

/// Encode linear samples into μ-law bytes.
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| encode_sample(s)).collect()
}

/// Decode μ-law bytes into a little-endian 16-bit PCM buffer.
///
/// The output is exactly twice the input length.
pub fn decode_to_pcm(mulaw: &[u8]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(mulaw.len() * 2);
    for &byte in mulaw {
        pcm.extend_from_slice(&decode_sample(byte).to_le_bytes());
    }
    pcm
}

/// Encode a little-endian 16-bit PCM buffer into μ-law bytes.
///
/// A trailing odd byte is ignored.
pub fn encode_from_pcm(pcm: &[u8]) -> Vec<u8> {
    pcm.chunks_exact(2)
        .map(|pair| encode_sample(i16::from_le_bytes([pair[0], pair[1]])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Half of the quantization interval a sample of this magnitude falls in.
    fn max_error(sample: i16) -> i32 {
        ((sample as i32).abs().min(MULAW_CLIP) + MULAW_BIAS) / 32
    }

    #[test]
    fn test_known_reference_values() {
        assert_eq!(encode_sample(0), 0xFF);
        assert_eq!(decode_sample(0xFF), 0);
        assert_eq!(decode_sample(0x7F), 0);
        assert_eq!(decode_sample(0x00), -32124);
        assert_eq!(decode_sample(0x80), 32124);
        assert_eq!(encode_sample(i16::MAX), 0x80);
        assert_eq!(encode_sample(i16::MIN), 0x00);
    }

    #[test]
    fn test_round_trip_stays_within_quantization_step() {
        for sample in (i16::MIN..=i16::MAX).step_by(7) {
            let decoded = decode_sample(encode_sample(sample));
            let error = (decoded as i32 - sample as i32).abs();
            if (sample as i32).abs() <= MULAW_CLIP {
                assert!(
                    error <= max_error(sample),
                    "sample {sample} decoded to {decoded} (error {error})"
                );
            } else {
                assert_eq!(decoded.abs(), 32124);
            }
        }
    }

    #[test]
    fn test_round_trip_preserves_sign() {
        for sample in (i16::MIN..=i16::MAX).step_by(3) {
            let decoded = decode_sample(encode_sample(sample));
            assert!(
                (decoded as i32) * (sample as i32) >= 0,
                "sign flipped for {sample} -> {decoded}"
            );
        }
    }

    #[test]
    fn test_decode_is_monotonic_over_positive_codes() {
        // 0xFF..=0x80 covers zero up to the largest positive level
        let levels: Vec<i16> = (0x80u8..=0xFF).rev().map(decode_sample).collect();
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_encode_decode_table_consistency() {
        // Every table level must encode back to the byte it came from,
        // except the duplicate negative zero.
        for byte in 0u8..=255 {
            if byte == 0x7F {
                continue;
            }
            assert_eq!(encode_sample(decode_sample(byte)), byte, "byte {byte:#04x}");
        }
    }

    #[test]
    fn test_decode_to_pcm_doubles_length_little_endian() {
        let pcm = decode_to_pcm(&[0xFF, 0x80, 0x00]);
        assert_eq!(pcm.len(), 6);
        assert_eq!(i16::from_le_bytes([pcm[0], pcm[1]]), 0);
        assert_eq!(i16::from_le_bytes([pcm[2], pcm[3]]), 32124);
        assert_eq!(i16::from_le_bytes([pcm[4], pcm[5]]), -32124);
    }

    #[test]
    fn test_encode_from_pcm_ignores_trailing_byte() {
        let mut pcm = Vec::new();
        pcm.extend_from_slice(&1000i16.to_le_bytes());
        pcm.extend_from_slice(&(-1000i16).to_le_bytes());
        pcm.push(0x12);
        let mulaw = encode_from_pcm(&pcm);
        assert_eq!(mulaw, encode_samples(&[1000, -1000]));
    }

    #[test]
    fn test_samples_helpers_match_scalar_functions() {
        let samples = [-20000i16, -5, 0, 5, 20000];
        let encoded = encode_samples(&samples);
        let decoded = decode_samples(&encoded);
        for (i, &s) in samples.iter().enumerate() {
            assert_eq!(encoded[i], encode_sample(s));
            assert_eq!(decoded[i], decode_sample(encoded[i]));
        }
    }
}
