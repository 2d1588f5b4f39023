//! The bitstring primitive shared by every codec.
//!
//! A [`BitString`] is an ordered, immutable-by-convention sequence of bits.
//! Byte conversions are MSB-first, the usual order for prefix codes.
//!
//! # Padding Rules
//! - `to_bytes`: pads the final partial byte with trailing zeros
//! - `from_bytes`: yields exactly `8 * len` bits (caller trims if needed)
//!
//! # Example
//! ```
//! use stegano_core::bits::BitString;
//!
//! let bits: BitString = "10111".parse().unwrap();
//! assert_eq!(bits.to_bytes(), vec![0b1011_1000]);
//! assert!(bits.starts_with(&"101".parse().unwrap()));
//! ```

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BitStringError, Result};

/// An ordered sequence of binary digits.
///
/// Ordering is lexicographic on the bits, with a shorter string sorting
/// before any longer string it prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitString {
    bits: Vec<bool>,
}

impl BitString {
    /// Create an empty bitstring.
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    /// Create a bitstring of `len` zero bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// Store `value` as an unsigned integer of exactly `width` bits, MSB first.
    ///
    /// # Errors
    /// - `BitStringError::InvalidWidth` if width > 64
    /// - `BitStringError::ValueTooWide` if value needs more than `width` bits
    pub fn from_uint(value: u64, width: usize) -> Result<Self> {
        if width > 64 {
            return Err(BitStringError::InvalidWidth(width).into());
        }
        if width < 64 && value >> width != 0 {
            return Err(BitStringError::ValueTooWide { value, width }.into());
        }

        let bits = (0..width).rev().map(|shift| (value >> shift) & 1 == 1).collect();
        Ok(Self { bits })
    }

    /// Read the bits as an unsigned integer, MSB first.
    ///
    /// # Errors
    /// Returns `BitStringError::InvalidWidth` if there are more than 64 bits.
    pub fn to_uint(&self) -> Result<u64> {
        if self.bits.len() > 64 {
            return Err(BitStringError::InvalidWidth(self.bits.len()).into());
        }
        Ok(self
            .bits
            .iter()
            .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit)))
    }

    /// Unpack bytes MSB-first.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut bits = Vec::with_capacity(bytes.len() * 8);
        for &byte in bytes {
            for shift in (0..8).rev() {
                bits.push((byte >> shift) & 1 == 1);
            }
        }
        Self { bits }
    }

    /// Pack bits MSB-first, zero-padding the final partial byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits
            .chunks(8)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u8, |byte, (i, &bit)| byte | (u8::from(bit) << (7 - i)))
            })
            .collect()
    }

    /// Encode UTF-8 text as its byte bits.
    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// Decode whole bytes of this bitstring as UTF-8 text.
    ///
    /// A trailing partial byte is ignored.
    pub fn to_text(&self) -> Result<String> {
        String::from_utf8(self.trim_to_bytes().to_bytes())
            .map_err(|_| BitStringError::InvalidUtf8.into())
    }

    /// Drop the trailing bits that do not fill a whole byte.
    pub fn trim_to_bytes(&self) -> Self {
        let whole = self.bits.len() - self.bits.len() % 8;
        self.slice(0..whole)
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True when there are no bits.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The bit at `index`, if any.
    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    /// Iterate over the bits in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().copied()
    }

    /// True when `prefix` is an exact prefix of this bitstring.
    pub fn starts_with(&self, prefix: &BitString) -> bool {
        self.bits.starts_with(&prefix.bits)
    }

    /// Copy out a sub-range. Out-of-range bounds are clamped.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.bits.len());
        let start = range.start.min(end);
        Self {
            bits: self.bits[start..end].to_vec(),
        }
    }

    /// Bits from `start` to the end (empty if past the end).
    pub fn tail(&self, start: usize) -> Self {
        self.slice(start..self.bits.len())
    }

    /// Split into the first `at` bits and the rest.
    pub fn split_at(&self, at: usize) -> (Self, Self) {
        (self.slice(0..at), self.tail(at))
    }

    /// Concatenate two bitstrings into a new one.
    pub fn concat(&self, other: &BitString) -> Self {
        let mut bits = Vec::with_capacity(self.bits.len() + other.bits.len());
        bits.extend_from_slice(&self.bits);
        bits.extend_from_slice(&other.bits);
        Self { bits }
    }

    /// Append a single bit.
    pub fn push(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Append all bits of `other`.
    pub fn extend(&mut self, other: &BitString) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// Bitwise XOR with a mask of at least the same length.
    pub fn xor(&self, mask: &BitString) -> Self {
        self.bits
            .iter()
            .zip(mask.bits.iter())
            .map(|(&a, &b)| a ^ b)
            .collect()
    }
}

impl FromIterator<bool> for BitString {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl FromStr for BitString {
    type Err = BitStringError;

    /// Parse `"0101"` notation. An optional `0b` prefix is accepted.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits = s.strip_prefix("0b").unwrap_or(s);
        digits
            .chars()
            .enumerate()
            .map(|(position, character)| match character {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(BitStringError::InvalidCharacter {
                    character,
                    position,
                }),
            })
            .collect()
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl Serialize for BitString {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BitString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
