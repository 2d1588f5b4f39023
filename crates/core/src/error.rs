//! Error types for the stegano codecs.
//!
//! All operations return structured errors rather than panicking. The
//! only silent recoveries in the codecs are the documented ones: zero-padding
//! a bit prefix that matches no code, and re-advancing a chain walk that lands
//! on the start state.

use std::fmt;

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - BitString: parsing or converting bit notation
/// - Structural: malformed Huffman trees
/// - Validation: Markov chains that break their invariants
/// - Lookup: words, word-types or symbols that cannot be resolved
/// - Framing: message lengths the header cannot carry, short cover texts
/// - I/O and JSON: persistence failures
#[derive(Debug, Error)]
pub enum Error {
    /// Bit notation could not be parsed or converted
    #[error("bitstring error: {0}")]
    BitString(#[from] BitStringError),

    /// Malformed Huffman tree
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Markov chain failed validation
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A word, word-type, state or symbol could not be resolved
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Message length or cover text does not fit the header framing
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted file was not valid JSON for the expected schema
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (bad option values, malformed list files)
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while parsing or converting bitstrings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitStringError {
    /// A character other than '0' or '1' appeared in bit notation
    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },

    /// Integer conversion asked for more than 64 bits
    #[error("invalid bit width: {0}")]
    InvalidWidth(usize),

    /// Value does not fit in the requested width
    #[error("value {value} does not fit in {width} bits")]
    ValueTooWide { value: u64, width: usize },

    /// Decoded bytes were not valid UTF-8
    #[error("bits do not decode to UTF-8 text")]
    InvalidUtf8,
}

/// Huffman tree structure errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    /// No symbols to build a tree from
    #[error("empty symbol set: cannot build a tree")]
    EmptySymbolSet,

    /// A node had exactly one child
    #[error("node {path} has exactly one child")]
    SingleChild { path: String },

    /// A leaf had no symbol, or an internal node carried one
    #[error("node {path} has a misplaced symbol")]
    MisplacedSymbol { path: String },

    /// A node had no path code where one is required
    #[error("node {node} has no path code")]
    MissingPathCode { node: String },

    /// A stored path code disagrees with the node's position
    #[error("node {path} carries path code {found}")]
    WrongPathCode { path: String, found: String },

    /// The root is a leaf, so no bits can be carried
    #[error("tree has a single symbol and cannot carry bits")]
    DegenerateTree,

    /// Two leaves carry the same symbol
    #[error("symbol {0:?} appears in more than one leaf")]
    DuplicateSymbol(String),
}

/// One broken invariant found while validating chain transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Transition endpoint is not a declared state
    UnknownState(String),
    /// Transition weight is zero, negative or not a number
    NonPositiveWeight { from: String, to: String, weight: f64 },
    /// Transition weight is infinite
    InfiniteWeight { from: String, to: String },
    /// Outbound weights of a state add up to more than `f64::MAX`
    WeightOverflow(String),
    /// Transition from a state to itself
    SelfLoop(String),
    /// The same (from, to) pair was given twice
    DuplicateTransition { from: String, to: String },
    /// No transition leaves the start state
    NoStartOutbound,
    /// No transition enters the start state
    NoStartInbound,
    /// A state reachable from the start state has no way out
    DeadEnd(String),
    /// Cycle that does not pass through the start state
    Cycle(Vec<String>),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::UnknownState(state) => write!(f, "unknown state {state:?}"),
            Violation::NonPositiveWeight { from, to, weight } => {
                write!(f, "non-positive weight {weight} on {from} -> {to}")
            }
            Violation::InfiniteWeight { from, to } => {
                write!(f, "infinite weight on {from} -> {to}")
            }
            Violation::WeightOverflow(state) => {
                write!(f, "outbound weights of {state} do not sum to a finite value")
            }
            Violation::SelfLoop(state) => write!(f, "self-loop on {state}"),
            Violation::DuplicateTransition { from, to } => {
                write!(f, "duplicate transition {from} -> {to}")
            }
            Violation::NoStartOutbound => write!(f, "start state has no outbound transitions"),
            Violation::NoStartInbound => write!(f, "start state has no inbound transitions"),
            Violation::DeadEnd(state) => write!(f, "state {state} has no outbound transitions"),
            Violation::Cycle(states) => write!(f, "cycle {}", states.join(" -> ")),
        }
    }
}

/// Markov chain validation failure, listing every violation found.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transitions: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Lookup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// No word's code matched the bit prefix, even after padding
    #[error("no word matches bits {bits}")]
    NoWordForBits { bits: String },

    /// The word-type of the current state has no dictionary
    #[error("no dictionary for word-type {0:?}")]
    MissingWordType(String),

    /// No known word starts the remaining cover text
    #[error("no known word at {context:?}")]
    NoWordInCover { context: String },

    /// A cover-text chunk matches no leaf symbol
    #[error("symbol {0:?} is not in the tree")]
    UnknownSymbol(String),

    /// State is not declared in the chain
    #[error("unknown state {0:?}")]
    UnknownState(String),

    /// The start state carries no word-type
    #[error("the start state has no word-type")]
    StartStateHasNoWordType,

    /// The chain has no transitions to walk
    #[error("state {0:?} has no outbound transitions")]
    NoTransitions(String),

    /// The dictionary has no words at all
    #[error("word-type dictionary is empty")]
    EmptyDictionary,
}

/// Message framing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Zero-length input
    #[error("input is empty")]
    EmptyInput,

    /// Message longer than the header can describe
    #[error("message of {length} bits exceeds header capacity of {capacity} bits")]
    MessageTooLong { length: u64, capacity: u128 },

    /// Header width outside the supported range
    #[error("header length {0} must be between 1 and 63 bits")]
    InvalidHeaderLength(usize),

    /// Header value passed to decode has the wrong width
    #[error("header has {actual} bits, expected {expected}")]
    HeaderWidthMismatch { expected: usize, actual: usize },

    /// Cover text ran out before enough bits were decoded
    #[error("cover text too short: needed {required} bits, decoded {decoded}")]
    InsufficientCoverText { required: usize, decoded: usize },

    /// Fixed-width symbol decoding needs a positive width
    #[error("symbol length must be at least 1")]
    InvalidSymbolLength,
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
