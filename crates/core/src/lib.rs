//! stegano-core: hide bits in plausible text
//!
//! This library provides two independent steganographic codecs:
//! - A reverse-Huffman codec that turns bits into symbols drawn from a
//!   frequency-weighted tree, mimicking the statistics of a sample text
//! - A lexical codec that walks a Markov chain of word-types and picks words
//!   from a dictionary, producing readable sentences
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `bits`: The bitstring primitive
//! - `huffman`: Reverse-Huffman tree codec
//! - `markov`: Constrained word-type chain and call-local walks
//! - `wtdict`: Word-type dictionaries
//! - `framing`: Length header and its fixed mask
//! - `coder`: Lexical encoder and decoder
//! - `analysis`: Sample-text frequency analysis and list files
//! - `persist`: JSON files for trees, chains and dictionaries
//! - `metrics`: Encode reports and structure statistics
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Validate before commit**: A rejected update leaves the old state intact
//! - **Deterministic**: Seeded randomness makes every cover text reproducible
//! - **Shareable**: Trees, chains and dictionaries are read-only during coding

pub mod analysis;
pub mod bits;
pub mod coder;
pub mod error;
pub mod framing;
pub mod huffman;
pub mod markov;
pub mod metrics;
pub mod persist;
pub mod wtdict;

// Re-export commonly used types
pub use bits::BitString;
pub use coder::{CoderConfig, DecodedMessage, EncodedMessage, ExtendedCoder};
pub use error::{Error, Result};
pub use huffman::HuffmanTree;
pub use markov::MarkovChain;
pub use wtdict::{MappingDictionary, WordTypeDictionary};
