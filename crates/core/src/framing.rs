//! Length-header framing for hidden messages.
//!
//! Every lexical cover text starts with a fixed-width header that tells the
//! decoder how many payload bits follow. The header width is pre-shared; the
//! header itself is obscured with a fixed XOR mask so that short messages do
//! not all begin with a telltale run of zero bits.
//!
//! # Frame Format
//!
//! ```text
//! +------------------------------+
//! | header (header_bits)         |  (message_len - 1) as unsigned, MSB first,
//! |                              |  XORed with the stream randomizer mask
//! +------------------------------+
//! | payload (message_len bits)   |  the secret bits, unchanged
//! +------------------------------+
//! ```
//!
//! Storing `n - 1` lets an `L`-bit header describe lengths `1..=2^L`.
//!
//! # Mask
//!
//! The mask comes from a ChaCha8 stream seeded with a compile-time constant,
//! one bit per output word. It is identical on every run and platform, and
//! applying it twice is the identity. It hides structure from a casual
//! reader; it is not encryption.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::bits::BitString;
use crate::error::{FramingError, Result};

/// Header width used when none is configured.
pub const DEFAULT_HEADER_BITS: usize = 20;

/// Widest supported header.
pub const MAX_HEADER_BITS: usize = 63;

/// Seed of the header mask stream.
const MASK_SEED: u64 = 109_460;

/// Deterministic XOR mask generator for header bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamRandomizer;

impl StreamRandomizer {
    /// The first `len` mask bits.
    pub fn mask(len: usize) -> BitString {
        let mut rng = ChaCha8Rng::seed_from_u64(MASK_SEED);
        (0..len).map(|_| rng.next_u32() >> 31 == 1).collect()
    }

    /// XOR `bits` with the mask. Self-inverse.
    pub fn apply(bits: &BitString) -> BitString {
        bits.xor(&Self::mask(bits.len()))
    }
}

/// Number of distinct lengths an `header_bits`-wide header can describe.
pub fn header_capacity(header_bits: usize) -> u128 {
    1u128 << header_bits
}

fn check_header_bits(header_bits: usize) -> Result<()> {
    if header_bits == 0 || header_bits > MAX_HEADER_BITS {
        return Err(FramingError::InvalidHeaderLength(header_bits).into());
    }
    Ok(())
}

/// Build the masked header for a message of `message_len` bits.
///
/// # Errors
/// - `FramingError::InvalidHeaderLength` if `header_bits` is outside `1..=63`
/// - `FramingError::EmptyInput` if `message_len` is 0
/// - `FramingError::MessageTooLong` if `message_len > 2^header_bits`
pub fn encode_length(message_len: u64, header_bits: usize) -> Result<BitString> {
    check_header_bits(header_bits)?;
    if message_len == 0 {
        return Err(FramingError::EmptyInput.into());
    }
    let capacity = header_capacity(header_bits);
    if u128::from(message_len) > capacity {
        return Err(FramingError::MessageTooLong {
            length: message_len,
            capacity,
        }
        .into());
    }

    let plain = BitString::from_uint(message_len - 1, header_bits)?;
    Ok(StreamRandomizer::apply(&plain))
}

/// Recover the message length from a masked header.
///
/// # Errors
/// - `FramingError::InvalidHeaderLength` if `header_bits` is outside `1..=63`
/// - `FramingError::HeaderWidthMismatch` if `header` is not `header_bits` long
pub fn decode_length(header: &BitString, header_bits: usize) -> Result<u64> {
    check_header_bits(header_bits)?;
    if header.len() != header_bits {
        return Err(FramingError::HeaderWidthMismatch {
            expected: header_bits,
            actual: header.len(),
        }
        .into());
    }
    Ok(StreamRandomizer::apply(header).to_uint()? + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn bits(s: &str) -> BitString {
        s.parse().unwrap()
    }

    #[test]
    fn test_mask_prefix() {
        assert_eq!(StreamRandomizer::mask(16), bits("1100100010011001"));
        // Shorter masks are prefixes of longer ones.
        assert!(StreamRandomizer::mask(40).starts_with(&StreamRandomizer::mask(16)));
    }

    #[test]
    fn test_mask_self_inverse() {
        let input = bits("0110100111010001011");
        let masked = StreamRandomizer::apply(&input);
        assert_ne!(masked, input);
        assert_eq!(StreamRandomizer::apply(&masked), input);
    }

    #[test]
    fn test_known_headers() {
        assert_eq!(encode_length(618, 16).unwrap(), bits("1100101011110000"));
        assert_eq!(encode_length(1, 8).unwrap(), bits("11001000"));
        assert_eq!(decode_length(&bits("1100101011110000"), 16).unwrap(), 618);
    }

    #[test]
    fn test_every_length_round_trips() {
        for header_bits in 1..=8 {
            for n in 1..=(1u64 << header_bits) {
                let header = encode_length(n, header_bits).unwrap();
                assert_eq!(header.len(), header_bits);
                assert_eq!(decode_length(&header, header_bits).unwrap(), n);
            }
        }
    }

    #[test]
    fn test_length_limits() {
        assert!(matches!(
            encode_length(0, 8),
            Err(Error::Framing(FramingError::EmptyInput))
        ));
        assert!(matches!(
            encode_length(257, 8),
            Err(Error::Framing(FramingError::MessageTooLong { length: 257, .. }))
        ));
        assert!(encode_length(256, 8).is_ok());
        assert!(encode_length(u64::MAX, 63).is_err());
        assert!(encode_length(1 << 63, 63).is_ok());
    }

    #[test]
    fn test_header_width_checks() {
        assert!(matches!(
            encode_length(1, 0),
            Err(Error::Framing(FramingError::InvalidHeaderLength(0)))
        ));
        assert!(encode_length(1, 64).is_err());
        assert!(matches!(
            decode_length(&bits("0101"), 8),
            Err(Error::Framing(FramingError::HeaderWidthMismatch { expected: 8, actual: 4 }))
        ));
    }
}
