//! Metrics and reports for encode runs, trees and chains.
//!
//! This module answers "how efficient was that?":
//! - Bits carried per word and per character of cover text
//! - How much of the cover text is header, payload and filler
//! - Code-length statistics of a Huffman tree
//! - Shape of a Markov chain
//!
//! # Design
//!
//! Metrics are plain structs filled in by the coder as it goes, with
//! `print_summary` for people and `export_text` for scripts and tests.

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::huffman::{average_code_length, expected_code_length, HuffmanTree};
use crate::markov::{MarkovChain, START_STATE};

/// Counters collected while encoding one message.
#[derive(Debug, Clone)]
pub struct EncodeMetrics {
    // === Timing ===
    /// When encoding started
    pub start_time: Instant,

    /// When encoding ended (set on completion)
    pub end_time: Option<Instant>,

    // === Bits ===
    /// Width of the length header
    pub header_bits: u64,

    /// Secret bits carried after the header
    pub payload_bits: u64,

    /// Zero bits appended so the last word could be chosen
    pub padding_bits: u64,

    // === Words ===
    /// Words that carry header or payload bits
    pub payload_words: u64,

    /// Words added afterwards to bring the walk back to the start state
    pub filler_words: u64,

    /// Characters in the rendered cover text
    pub cover_chars: u64,
}

impl EncodeMetrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            header_bits: 0,
            payload_bits: 0,
            padding_bits: 0,
            payload_words: 0,
            filler_words: 0,
            cover_chars: 0,
        }
    }

    /// Mark encoding as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// All words in the cover text.
    pub fn total_words(&self) -> u64 {
        self.payload_words + self.filler_words
    }

    /// Header and payload bits per word of cover text.
    ///
    /// Returns 0.0 if no words were produced.
    pub fn bits_per_word(&self) -> f64 {
        let words = self.total_words();
        if words == 0 {
            0.0
        } else {
            (self.header_bits + self.payload_bits) as f64 / words as f64
        }
    }

    /// Payload bits per character of cover text.
    pub fn bits_per_char(&self) -> f64 {
        if self.cover_chars == 0 {
            0.0
        } else {
            self.payload_bits as f64 / self.cover_chars as f64
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Encode Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!();

        println!("=== Bits ===");
        println!("Header: {}", self.header_bits);
        println!("Payload: {}", self.payload_bits);
        println!("Padding: {}", self.padding_bits);
        println!();

        println!("=== Cover Text ===");
        println!("Payload words: {}", self.payload_words);
        println!("Filler words: {}", self.filler_words);
        println!("Characters: {}", self.cover_chars);
        println!("Bits per word: {:.3}", self.bits_per_word());
        println!("Payload bits per character: {:.3}", self.bits_per_char());
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             header_bits={}\n\
             payload_bits={}\n\
             padding_bits={}\n\
             payload_words={}\n\
             filler_words={}\n\
             cover_chars={}\n\
             bits_per_word={:.4}\n\
             bits_per_char={:.4}\n",
            self.duration().as_millis(),
            self.header_bits,
            self.payload_bits,
            self.padding_bits,
            self.payload_words,
            self.filler_words,
            self.cover_chars,
            self.bits_per_word(),
            self.bits_per_char(),
        )
    }
}

impl Default for EncodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Code-length statistics of a Huffman tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub symbol_count: usize,
    pub average_code_length: f64,
    pub expected_code_length: f64,
    pub depth: usize,
}

impl TreeStats {
    /// Collect statistics from a tree with allocated path codes.
    pub fn from_tree(tree: &HuffmanTree) -> Result<Self> {
        let codes = tree.leaf_path_codes()?;
        Ok(Self {
            symbol_count: codes.len(),
            average_code_length: average_code_length(&codes),
            expected_code_length: expected_code_length(&codes),
            depth: tree.depth(),
        })
    }

    pub fn print_summary(&self) {
        println!("\n=== Tree Summary ===");
        println!("Symbols: {}", self.symbol_count);
        println!("Depth: {}", self.depth);
        println!("Average code length: {:.4}", self.average_code_length);
        println!("Expected code length: {:.4}", self.expected_code_length);
        println!();
    }

    pub fn export_text(&self) -> String {
        format!(
            "symbol_count={}\n\
             depth={}\n\
             average_code_length={:.4}\n\
             expected_code_length={:.4}\n",
            self.symbol_count, self.depth, self.average_code_length, self.expected_code_length,
        )
    }
}

/// Shape of a Markov chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    /// Declared states, including the start state
    pub states: usize,
    pub transitions: usize,
    /// Distinct walks from the start state back to itself
    pub cycles_through_start: u64,
}

impl ChainStats {
    pub fn from_chain(chain: &MarkovChain) -> Result<Self> {
        let transitions = chain
            .states()
            .filter_map(|state| chain.transitions_from(state))
            .map(|targets| targets.len())
            .sum();
        Ok(Self {
            states: chain.states().count(),
            transitions,
            cycles_through_start: chain.path_count_to_start(START_STATE)?,
        })
    }

    pub fn print_summary(&self) {
        println!("\n=== Chain Summary ===");
        println!("States: {}", self.states);
        println!("Transitions: {}", self.transitions);
        println!("Distinct walks: {}", self.cycles_through_start);
        println!();
    }
}
