//! Random payload generation for trying out the codecs.
//!
//! Real secrets are usually encrypted first, so their bits look random. To
//! also show how the codecs behave on skewed input, a payload is built from
//! runs of differently shaped sections:
//! - Uniformly random bits (what ciphertext looks like)
//! - Long runs of one bit value
//! - A short pattern repeated
//! - Bits of lower-case ASCII text

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use stegano_core::persist::write_atomic;
use stegano_core::BitString;

const SECTION_BITS: usize = 256;

/// Generate `len` payload bits, reproducible from `seed`.
pub fn generate_payload_bits(seed: u64, len: usize) -> BitString {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut bits = BitString::new();

    while bits.len() < len {
        let section = SECTION_BITS.min(len - bits.len());

        match rng.gen_range(0..10) {
            // 50% random
            0..=4 => {
                for _ in 0..section {
                    bits.push(rng.gen());
                }
            }

            // 20% runs
            5..=6 => {
                let value: bool = rng.gen();
                for _ in 0..section {
                    bits.push(value);
                }
            }

            // 20% repeating pattern
            7..=8 => {
                let pattern = generate_pattern(&mut rng);
                for i in 0..section {
                    bits.push(pattern[i % pattern.len()]);
                }
            }

            // 10% text-like
            _ => {
                let alphabet = b"abcdefghijklmnopqrstuvwxyz .,";
                let mut text = Vec::with_capacity(section / 8 + 1);
                for _ in 0..=section / 8 {
                    text.push(alphabet[rng.gen_range(0..alphabet.len())]);
                }
                bits.extend(&BitString::from_bytes(&text).slice(0..section));
            }
        }
    }

    bits
}

fn generate_pattern(rng: &mut ChaCha8Rng) -> Vec<bool> {
    let pattern_len = rng.gen_range(2..=16);
    (0..pattern_len).map(|_| rng.gen()).collect()
}

/// Write a generated payload as a `0101` text file.
pub fn write_payload_file(path: &Path, seed: u64, len: usize) -> stegano_core::Result<()> {
    let bits = generate_payload_bits(seed, len);
    write_atomic(path, bits.to_string().as_bytes())
}
