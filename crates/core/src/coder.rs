//! The lexical-substitution coder: bits to sentences and back.
//!
//! Encoding walks a [`MarkovChain`] to choose a word-type for every position
//! in the cover text, then picks the word of that type whose code is the
//! longest prefix of the bits still to be sent. Decoding needs no chain: each
//! word of the cover text is looked up in the [`WordTypeDictionary`], which
//! guarantees a word belongs to one word-type only.
//!
//! # Message Layout
//!
//! ```text
//! cover text words:  | w1 | w2 | w3 | ... | wk | filler ... |
//! bits carried:      | header (L) | payload (n)  | ignored    |
//! ```
//!
//! A word may straddle the header/payload boundary; its excess bits
//! ("trailing bits") are carried over into the payload. The final payload
//! word may carry zero bits of padding, and filler words bring the walk back
//! to the start state so the text ends on a complete sentence.

use rand::Rng;

use crate::bits::BitString;
use crate::error::{FramingError, LookupError, Result};
use crate::framing::{decode_length, encode_length, DEFAULT_HEADER_BITS};
use crate::markov::{MarkovChain, START_STATE};
use crate::metrics::EncodeMetrics;
use crate::wtdict::{MappingDictionary, WordTypeDictionary};

/// Coder options shared by encoder and decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoderConfig {
    /// Width of the length header. Both sides must agree on it.
    pub header_bits: usize,
    /// Add filler words until the walk returns to the start state
    pub pad_text: bool,
    /// Upper-case the first character of the cover text
    pub capitalise_start: bool,
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            header_bits: DEFAULT_HEADER_BITS,
            pad_text: true,
            capitalise_start: true,
        }
    }
}

/// A generated cover text and how it was built.
#[derive(Debug, Clone)]
pub struct EncodedMessage {
    pub cover_text: String,
    pub metrics: EncodeMetrics,
}

/// Bits recovered from a cover text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub bits: BitString,
    /// Cover text left after the message was complete
    pub leftover: String,
}

impl DecodedMessage {
    /// True if words remained after the message; filler words or a
    /// mismatched header length both cause this.
    pub fn has_leftover(&self) -> bool {
        !self.leftover.trim().is_empty()
    }
}

/// Encoder/decoder over one chain and one dictionary.
#[derive(Debug, Clone, Copy)]
pub struct ExtendedCoder<'a> {
    chain: &'a MarkovChain,
    dictionary: &'a WordTypeDictionary,
    config: CoderConfig,
}

impl<'a> ExtendedCoder<'a> {
    pub fn new(chain: &'a MarkovChain, dictionary: &'a WordTypeDictionary) -> Self {
        Self {
            chain,
            dictionary,
            config: CoderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CoderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    /// Hide `bits` in a cover text using the thread-local random source.
    pub fn encode_message(&self, bits: &BitString) -> Result<EncodedMessage> {
        self.encode_message_with_rng(bits, &mut rand::thread_rng())
    }

    /// Hide `bits` in a cover text, drawing every random choice from `rng`.
    ///
    /// The same seed, chain, dictionary and input always give the same text.
    ///
    /// # Errors
    /// - `FramingError::EmptyInput` if `bits` is empty
    /// - `FramingError::MessageTooLong` if the header cannot describe `bits`
    /// - `LookupError` if the dictionary is empty, a state's word-type has
    ///   no dictionary, or the chain has no transitions
    pub fn encode_message_with_rng<R: Rng>(
        &self,
        bits: &BitString,
        rng: &mut R,
    ) -> Result<EncodedMessage> {
        if bits.is_empty() {
            return Err(FramingError::EmptyInput.into());
        }
        if self.dictionary.is_empty() {
            return Err(LookupError::EmptyDictionary.into());
        }

        let mut metrics = EncodeMetrics::new();
        let header = encode_length(bits.len() as u64, self.config.header_bits)?;
        metrics.header_bits = header.len() as u64;
        metrics.payload_bits = bits.len() as u64;
        let payload = header.concat(bits);

        let mut words: Vec<(&str, bool)> = Vec::new();
        let mut walk = self.chain.walk(rng);
        let mut position = 0;

        while position < payload.len() {
            walk.advance()?;
            if walk.is_at_start() {
                walk.advance()?;
            }
            let mappings = self.mappings_for(walk.word_type()?)?;
            let remaining = payload.tail(position);
            let (word, code) = find_word(mappings, &remaining, true)?;
            log::debug!("{} -> {word:?} ({code})", walk.current_state());

            let consumed = code.len().min(remaining.len());
            metrics.padding_bits += (code.len() - consumed) as u64;
            metrics.payload_words += 1;
            position += consumed;
            words.push((word, mappings.encode_spaces()));
        }

        if self.config.pad_text {
            while !walk.is_at_start() {
                if walk.advance()? == START_STATE {
                    break;
                }
                let mappings = self.mappings_for(walk.word_type()?)?;
                let width = mappings.longest_code_len();
                let filler: BitString = (0..width).map(|_| walk.rng_mut().gen::<bool>()).collect();
                let (word, _) = find_word(mappings, &filler, true)?;
                metrics.filler_words += 1;
                words.push((word, mappings.encode_spaces()));
            }
        }

        let capitalise = self.config.capitalise_start
            && words
                .first()
                .map_or(true, |(word, _)| self.capitalises_unambiguously(word));
        let cover_text = words_to_cover_text(&words, capitalise);
        metrics.cover_chars = cover_text.chars().count() as u64;
        metrics.complete();

        Ok(EncodedMessage {
            cover_text,
            metrics,
        })
    }

    /// Recover the bits hidden in `cover_text`.
    pub fn decode_cover_text(&self, cover_text: &str) -> Result<DecodedMessage> {
        decode_cover_text(self.dictionary, cover_text, self.config.header_bits)
    }

    /// Whether `word` can be capitalised without turning into another
    /// dictionary word, which [`next_word`] would find first.
    fn capitalises_unambiguously(&self, word: &str) -> bool {
        let capitalised = capitalise_first(word);
        if capitalised != word && self.dictionary.lookup(&capitalised).is_some() {
            log::debug!("leaving {word:?} lower-case: {capitalised:?} is also in the dictionary");
            return false;
        }
        true
    }

    fn mappings_for(&self, word_type: &str) -> Result<&'a MappingDictionary> {
        self.dictionary
            .get(word_type)
            .ok_or_else(|| LookupError::MissingWordType(word_type.to_string()).into())
    }
}

/// Recover the bits hidden in `cover_text`, given the dictionary and header
/// width it was encoded with.
///
/// Text left over once the message is complete is returned in
/// [`DecodedMessage::leftover`] and logged as a warning.
pub fn decode_cover_text(
    dictionary: &WordTypeDictionary,
    cover_text: &str,
    header_bits: usize,
) -> Result<DecodedMessage> {
    if cover_text.trim().is_empty() {
        return Err(FramingError::EmptyInput.into());
    }
    if dictionary.is_empty() {
        return Err(LookupError::EmptyDictionary.into());
    }

    let header = fixed_size_decode(dictionary, cover_text, header_bits, BitString::new())?;
    let length = decode_length(&header.bits, header_bits)?;
    let length = usize::try_from(length).map_err(|_| FramingError::MessageTooLong {
        length,
        capacity: usize::MAX as u128,
    })?;

    let body = fixed_size_decode(dictionary, header.remaining, length, header.trailing)?;
    let leftover = body.remaining.to_string();
    if !leftover.trim().is_empty() {
        log::warn!(
            "{} characters left over in the cover text; check the header length",
            leftover.chars().count()
        );
    }

    Ok(DecodedMessage {
        bits: body.bits,
        leftover,
    })
}

/// Output of [`fixed_size_decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSizeDecode<'t> {
    /// Exactly the requested number of bits
    pub bits: BitString,
    /// Bits decoded past the requested count
    pub trailing: BitString,
    /// Cover text not yet consumed
    pub remaining: &'t str,
}

/// Decode words from `cover_text` until at least `required` bits are known.
///
/// `seed` bits count towards the total, so bits left over from an earlier
/// field can be carried in. If `seed` alone is long enough, no text is read.
///
/// # Errors
/// - `FramingError::InsufficientCoverText` if the text ends first
/// - `LookupError::NoWordInCover` if the text holds an unknown word
pub fn fixed_size_decode<'t>(
    dictionary: &WordTypeDictionary,
    cover_text: &'t str,
    required: usize,
    seed: BitString,
) -> Result<FixedSizeDecode<'t>> {
    let mut bits = seed;
    let mut remaining = cover_text;

    while bits.len() < required {
        if remaining.trim().is_empty() {
            return Err(FramingError::InsufficientCoverText {
                required,
                decoded: bits.len(),
            }
            .into());
        }
        let next = next_word(dictionary, remaining)?;
        bits.extend(next.bits);
        remaining = &remaining[next.consumed..];
    }

    let (bits, trailing) = bits.split_at(required);
    Ok(FixedSizeDecode {
        bits,
        trailing,
        remaining,
    })
}

/// A word found at the start of a cover text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextWord<'a> {
    pub word_type: &'a str,
    pub bits: &'a BitString,
    /// Bytes of cover text used, including one skipped leading space
    pub consumed: usize,
}

/// Find the dictionary word at the start of `text`.
///
/// One leading space is skipped. The search window ends at the next space
/// and is never longer than the longest dictionary word; candidates are
/// tried longest first, as written and then lower-cased.
///
/// A word written exactly as in the dictionary always wins over its
/// lower-cased form, so with both `Apple` and `apple` present the text
/// `Apple` decodes as `Apple`. The encoder never capitalises a word into
/// another dictionary word.
pub fn next_word<'a>(dictionary: &'a WordTypeDictionary, text: &str) -> Result<NextWord<'a>> {
    let longest = dictionary.longest_word_len();
    if longest == 0 {
        return Err(LookupError::EmptyDictionary.into());
    }

    let (skipped, rest) = match text.strip_prefix(' ') {
        Some(rest) => (1, rest),
        None => (0, text),
    };
    let boundaries: Vec<usize> = rest
        .char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(rest.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut bound = longest.min(char_count);
    if let Some(space) = rest.chars().skip(1).position(|c| c == ' ') {
        bound = bound.min(space + 1);
    }

    for len in (1..=bound).rev() {
        let end = boundaries[len];
        let candidate = &rest[..end];
        let found = dictionary
            .lookup(candidate)
            .or_else(|| dictionary.lookup(&candidate.to_lowercase()));
        if let Some((word_type, bits)) = found {
            return Ok(NextWord {
                word_type,
                bits,
                consumed: skipped + end,
            });
        }
    }

    Err(LookupError::NoWordInCover {
        context: rest.chars().take(longest).collect(),
    }
    .into())
}

/// Pick the word whose code is the longest exact prefix of `bits`.
///
/// When nothing matches and `allow_padding` is set, zero bits are appended
/// one at a time (up to the longest code length) until a code matches.
///
/// # Errors
/// - `LookupError::EmptyDictionary` if `mappings` has no words
/// - `LookupError::NoWordForBits` if no word matches, even after padding
pub fn find_word<'a>(
    mappings: &'a MappingDictionary,
    bits: &BitString,
    allow_padding: bool,
) -> Result<(&'a str, &'a BitString)> {
    if mappings.is_empty() {
        return Err(LookupError::EmptyDictionary.into());
    }
    if let Some(found) = mappings.longest_prefix_match(bits) {
        return Ok(found);
    }

    let longest = mappings.longest_code_len();
    if allow_padding {
        let mut padded = bits.clone();
        while padded.len() < longest {
            padded.push(false);
            if let Some(found) = mappings.longest_prefix_match(&padded) {
                return Ok(found);
            }
        }
    }

    Err(LookupError::NoWordForBits {
        bits: bits.slice(0..longest).to_string(),
    }
    .into())
}

/// Join words into a cover text.
///
/// A space goes before every word except the first, unless that word's
/// type has `encode_spaces` turned off.
pub fn words_to_cover_text(words: &[(&str, bool)], capitalise_start: bool) -> String {
    let mut cover_text = String::new();
    for (index, (word, encode_spaces)) in words.iter().enumerate() {
        if index == 0 {
            if capitalise_start {
                cover_text.push_str(&capitalise_first(word));
            } else {
                cover_text.push_str(word);
            }
            continue;
        }
        if *encode_spaces {
            cover_text.push(' ');
        }
        cover_text.push_str(word);
    }
    cover_text
}

fn capitalise_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
