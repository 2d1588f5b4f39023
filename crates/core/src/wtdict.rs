//! Word-type dictionaries: which words exist, and which bits each one carries.
//!
//! A [`MappingDictionary`] holds one word-type's word-to-bitstring table,
//! kept as a bijection so a code identifies exactly one word. A
//! [`WordTypeDictionary`] groups them by word-type name and guarantees a word
//! appears under at most one word-type, so a decoder can resolve a word's type
//! by lookup alone.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::bits::BitString;

/// On-disk shape of a mapping dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerialMappings {
    #[serde(default = "default_encode_spaces")]
    encode_spaces: bool,
    #[serde(default)]
    mappings: BTreeMap<String, BitString>,
}

fn default_encode_spaces() -> bool {
    true
}

/// One word-type's words and their codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SerialMappings", into = "SerialMappings")]
pub struct MappingDictionary {
    mappings: BTreeMap<String, BitString>,
    /// Reverse index, always the exact inverse of `mappings`
    codes: BTreeMap<BitString, String>,
    /// Whether words of this type are preceded by a space in cover text
    encode_spaces: bool,
}

impl MappingDictionary {
    /// Build from (word, code) pairs.
    ///
    /// Entries with an empty word, a word containing a space, or an empty
    /// code are dropped. A word listed twice keeps its smallest code; a code
    /// listed twice keeps its smallest word.
    pub fn new<I, S>(pairs: I, encode_spaces: bool) -> Self
    where
        I: IntoIterator<Item = (S, BitString)>,
        S: Into<String>,
    {
        let mut by_word: BTreeMap<String, BitString> = BTreeMap::new();
        for (word, code) in pairs {
            let word = word.into();
            if word.is_empty() || word.contains(' ') || code.is_empty() {
                log::warn!("dropping mapping {word:?} -> {code:?}", code = code.to_string());
                continue;
            }
            match by_word.get(&word) {
                Some(existing) if *existing <= code => {}
                _ => {
                    by_word.insert(word, code);
                }
            }
        }

        let mut dictionary = Self::empty(encode_spaces);
        for (word, code) in by_word {
            if dictionary.codes.contains_key(&code) {
                log::warn!("dropping mapping {word:?}: code {code} is already used");
                continue;
            }
            dictionary.codes.insert(code.clone(), word.clone());
            dictionary.mappings.insert(word, code);
        }
        dictionary
    }

    /// A dictionary with no words.
    pub fn empty(encode_spaces: bool) -> Self {
        Self {
            mappings: BTreeMap::new(),
            codes: BTreeMap::new(),
            encode_spaces,
        }
    }

    pub fn encode_spaces(&self) -> bool {
        self.encode_spaces
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Code carried by `word`.
    pub fn get(&self, word: &str) -> Option<&BitString> {
        self.mappings.get(word)
    }

    /// Word carrying exactly `code`.
    pub fn word_for(&self, code: &BitString) -> Option<&str> {
        self.codes.get(code).map(String::as_str)
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.mappings.contains_key(word)
    }

    /// (word, code) pairs in word order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BitString)> {
        self.mappings.iter().map(|(word, code)| (word.as_str(), code))
    }

    /// Length in bits of the longest code.
    pub fn longest_code_len(&self) -> usize {
        self.codes.keys().map(BitString::len).max().unwrap_or(0)
    }

    /// Length in characters of the longest word.
    pub fn longest_word_len(&self) -> usize {
        self.mappings.keys().map(|w| w.chars().count()).max().unwrap_or(0)
    }

    /// The word whose code is the longest exact prefix of `bits`.
    pub fn longest_prefix_match(&self, bits: &BitString) -> Option<(&str, &BitString)> {
        let longest = self.longest_code_len().min(bits.len());
        (1..=longest).rev().find_map(|len| {
            self.codes
                .get_key_value(&bits.slice(0..len))
                .map(|(code, word)| (word.as_str(), code))
        })
    }

    /// Set `word`'s code, replacing its old code and evicting any other word
    /// that already carried `code`.
    pub fn insert(&mut self, word: String, code: BitString) {
        if let Some(evicted) = self.codes.remove(&code) {
            if evicted != word {
                log::debug!("code {code} moves from {evicted:?} to {word:?}");
                self.mappings.remove(&evicted);
            }
        }
        if let Some(old) = self.mappings.insert(word.clone(), code.clone()) {
            if old != code {
                self.codes.remove(&old);
            }
        }
        self.codes.insert(code, word);
    }

    /// Remove `word`, returning its code.
    pub fn remove(&mut self, word: &str) -> Option<BitString> {
        let code = self.mappings.remove(word)?;
        self.codes.remove(&code);
        Some(code)
    }
}

impl From<SerialMappings> for MappingDictionary {
    fn from(serial: SerialMappings) -> Self {
        Self::new(serial.mappings, serial.encode_spaces)
    }
}

impl From<MappingDictionary> for SerialMappings {
    fn from(dictionary: MappingDictionary) -> Self {
        Self {
            encode_spaces: dictionary.encode_spaces,
            mappings: dictionary.mappings,
        }
    }
}

type WordTypes = BTreeMap<String, MappingDictionary>;

/// All word-types known to a coder.
///
/// An empty dictionary is held as `None`, never as an empty map, and no
/// stored word-type is ever empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<WordTypes>", into = "WordTypes")]
pub struct WordTypeDictionary {
    word_types: Option<WordTypes>,
}

impl WordTypeDictionary {
    /// Build from word-types, applying the same rules as [`merge`](Self::merge).
    pub fn new(word_types: WordTypes) -> Self {
        let mut dictionary = Self::default();
        dictionary.merge(word_types);
        dictionary
    }

    /// The empty dictionary.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.word_types.is_none()
    }

    /// Number of word-types.
    pub fn len(&self) -> usize {
        self.word_types.as_ref().map_or(0, BTreeMap::len)
    }

    /// Total number of words across every word-type.
    pub fn word_count(&self) -> usize {
        self.iter().map(|(_, mappings)| mappings.len()).sum()
    }

    pub fn get(&self, word_type: &str) -> Option<&MappingDictionary> {
        self.word_types.as_ref()?.get(word_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MappingDictionary)> {
        self.word_types
            .iter()
            .flatten()
            .map(|(name, mappings)| (name.as_str(), mappings))
    }

    /// Word-type names in sorted order.
    pub fn word_type_names(&self) -> Vec<&str> {
        self.iter().map(|(name, _)| name).collect()
    }

    /// Find `word` under any word-type, returning (word-type, code).
    pub fn lookup(&self, word: &str) -> Option<(&str, &BitString)> {
        self.iter()
            .find_map(|(name, mappings)| mappings.get(word).map(|code| (name, code)))
    }

    /// Length in characters of the longest word under any word-type.
    pub fn longest_word_len(&self) -> usize {
        self.iter()
            .map(|(_, mappings)| mappings.longest_word_len())
            .max()
            .unwrap_or(0)
    }

    /// Words of `mappings` that are stored under a word-type other than `name`.
    ///
    /// These are the words [`merge`](Self::merge) would strip when adding
    /// `mappings` as `name`.
    pub fn words_owned_elsewhere(&self, name: &str, mappings: &MappingDictionary) -> Vec<String> {
        match &self.word_types {
            Some(word_types) => owned_by_other_types(word_types, name, mappings).collect(),
            None => Vec::new(),
        }
    }

    /// Merge word-types into this dictionary, returning how many words were added or updated.
    ///
    /// Incoming word-types are processed in name order. Words already stored
    /// under a different word-type are stripped from the incoming set; an
    /// incoming word-type left empty is discarded. The remaining words are
    /// added to the matching word-type, created if new, overwriting the code
    /// of any word already there.
    pub fn merge(&mut self, incoming: WordTypes) -> usize {
        let mut merged = 0;
        let word_types = self.word_types.get_or_insert_with(BTreeMap::new);

        for (name, mappings) in incoming {
            let owned_elsewhere: BTreeSet<String> =
                owned_by_other_types(word_types, &name, &mappings).collect();
            for word in &owned_elsewhere {
                log::warn!(
                    "word {word:?} already belongs to another word-type; not adding it to {name:?}"
                );
            }

            let accepted: Vec<(String, BitString)> = mappings
                .mappings
                .into_iter()
                .filter(|(word, _)| !owned_elsewhere.contains(word))
                .collect();
            if accepted.is_empty() {
                log::debug!("discarding empty word-type {name:?}");
                continue;
            }

            let target = word_types
                .entry(name)
                .or_insert_with(|| MappingDictionary::empty(mappings.encode_spaces));
            for (word, code) in accepted {
                target.insert(word, code);
                merged += 1;
            }
        }

        self.normalise();
        merged
    }

    /// Remove whole word-types by name, returning how many were removed. Unknown names are ignored.
    pub fn remove_word_types<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(word_types) = self.word_types.as_mut() else {
            return 0;
        };
        let mut removed = 0;
        for name in names {
            if word_types.remove(name.as_ref()).is_some() {
                removed += 1;
            }
        }
        self.normalise();
        removed
    }

    /// Remove individual words from whichever word-type holds them,
    /// returning how many were removed. Word-types left empty are deleted.
    pub fn remove_words<I, S>(&mut self, words: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(word_types) = self.word_types.as_mut() else {
            return 0;
        };
        let mut removed = 0;
        for word in words {
            for mappings in word_types.values_mut() {
                if mappings.remove(word.as_ref()).is_some() {
                    removed += 1;
                }
            }
        }
        self.normalise();
        removed
    }

    fn normalise(&mut self) {
        if let Some(word_types) = self.word_types.as_mut() {
            word_types.retain(|_, mappings| !mappings.is_empty());
            if word_types.is_empty() {
                self.word_types = None;
            }
        }
    }
}

impl From<Option<WordTypes>> for WordTypeDictionary {
    fn from(word_types: Option<WordTypes>) -> Self {
        Self::new(word_types.unwrap_or_default())
    }
}

impl From<WordTypeDictionary> for WordTypes {
    fn from(dictionary: WordTypeDictionary) -> Self {
        dictionary.word_types.unwrap_or_default()
    }
}

fn owned_by_other_types<'a>(
    word_types: &'a WordTypes,
    name: &'a str,
    mappings: &'a MappingDictionary,
) -> impl Iterator<Item = String> + 'a {
    mappings
        .iter()
        .filter(move |(word, _)| {
            word_types
                .iter()
                .any(|(other, existing)| other != name && existing.contains_word(word))
        })
        .map(|(word, _)| word.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> BitString {
        s.parse().unwrap()
    }

    fn mappings(pairs: &[(&str, &str)], encode_spaces: bool) -> MappingDictionary {
        MappingDictionary::new(pairs.iter().map(|(w, b)| (*w, bits(b))), encode_spaces)
    }

    fn sample_dictionary() -> WordTypeDictionary {
        let mut word_types = BTreeMap::new();
        word_types.insert(
            "animals".to_string(),
            mappings(&[("penguin", "00"), ("tiger", "01"), ("giraffe", "11")], true),
        );
        word_types.insert(
            "stationery".to_string(),
            mappings(&[("pen", "00"), ("pencil", "01"), ("paper", "11")], false),
        );
        WordTypeDictionary::new(word_types)
    }

    #[test]
    fn test_mapping_dictionary() {
        let dict = mappings(&[("penguin", "00"), ("tiger", "01"), ("giraffe", "11")], true);
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.get("tiger"), Some(&bits("01")));
        assert_eq!(dict.get("ossifrage"), None);
        assert_eq!(dict.word_for(&bits("11")), Some("giraffe"));
        assert!(dict.encode_spaces());
    }

    #[test]
    fn test_duplicate_words_keep_smallest_code() {
        let dict = mappings(&[("penguin", "100"), ("penguin", "00"), ("tiger", "01")], true);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("penguin"), Some(&bits("00")));
    }

    #[test]
    fn test_duplicate_codes_keep_smallest_word() {
        let dict = mappings(&[("wolf", "00"), ("penguin", "00"), ("tiger", "01")], true);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.word_for(&bits("00")), Some("penguin"));
        assert!(!dict.contains_word("wolf"));
    }

    #[test]
    fn test_invalid_entries_dropped() {
        let dict = MappingDictionary::new(
            vec![
                ("", bits("0")),
                ("two words", bits("10")),
                ("ok", bits("11")),
                ("empty", BitString::new()),
            ],
            true,
        );
        assert_eq!(dict.iter().collect::<Vec<_>>(), vec![("ok", &bits("11"))]);
    }

    #[test]
    fn test_longest_prefix_match() {
        let dict = mappings(&[("a", "0"), ("b", "01"), ("c", "011")], true);
        assert_eq!(dict.longest_prefix_match(&bits("0111")).map(|m| m.0), Some("c"));
        assert_eq!(dict.longest_prefix_match(&bits("010")).map(|m| m.0), Some("b"));
        assert_eq!(dict.longest_prefix_match(&bits("00")).map(|m| m.0), Some("a"));
        assert_eq!(dict.longest_prefix_match(&bits("1")), None);
        assert_eq!(dict.longest_code_len(), 3);
    }

    #[test]
    fn test_insert_keeps_bijection() {
        let mut dict = mappings(&[("a", "0"), ("b", "1")], true);
        dict.insert("a".into(), bits("10"));
        assert_eq!(dict.word_for(&bits("0")), None);
        dict.insert("c".into(), bits("1"));
        assert!(!dict.contains_word("b"));
        assert_eq!(dict.word_for(&bits("1")), Some("c"));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_word_type_dictionary() {
        let dict = sample_dictionary();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.word_count(), 6);
        assert_eq!(dict.word_type_names(), vec!["animals", "stationery"]);
        assert_eq!(dict.lookup("pencil"), Some(("stationery", &bits("01"))));
        assert_eq!(dict.longest_word_len(), 7);
    }

    #[test]
    fn test_empty_word_type_is_absent() {
        let mut word_types = BTreeMap::new();
        word_types.insert("empty".to_string(), MappingDictionary::empty(true));
        let dict = WordTypeDictionary::new(word_types);
        assert!(dict.is_empty());
        assert_eq!(dict, WordTypeDictionary::empty());
    }

    #[test]
    fn test_merge_into_existing_word_type() {
        let mut dict = sample_dictionary();
        let mut incoming = BTreeMap::new();
        incoming.insert(
            "stationery".to_string(),
            mappings(&[("pen", "10"), ("ruler", "101")], true),
        );
        assert_eq!(dict.merge(incoming), 2);

        let stationery = dict.get("stationery").unwrap();
        assert_eq!(stationery.len(), 4);
        assert_eq!(stationery.get("pen"), Some(&bits("10")));
        assert_eq!(stationery.get("ruler"), Some(&bits("101")));
        assert!(!stationery.encode_spaces());
    }

    #[test]
    fn test_merge_new_and_empty_word_types() {
        let mut dict = sample_dictionary();
        let mut incoming = BTreeMap::new();
        incoming.insert(
            "food".to_string(),
            mappings(&[("apple", "1"), ("burger", "00"), ("salad", "01")], true),
        );
        incoming.insert("empty".to_string(), MappingDictionary::empty(true));
        dict.merge(incoming);

        assert_eq!(dict.len(), 3);
        assert_eq!(dict.get("food").map(MappingDictionary::len), Some(3));
        assert!(dict.get("empty").is_none());
    }

    #[test]
    fn test_merge_strips_words_owned_elsewhere() {
        let mut dict = sample_dictionary();
        let mut incoming = BTreeMap::new();
        incoming.insert("misc".to_string(), mappings(&[("giraffe", "1"), ("cube", "00")], true));
        incoming.insert("misc_2".to_string(), mappings(&[("cube", "01"), ("grass", "11")], true));
        dict.merge(incoming);

        assert_eq!(dict.len(), 4);
        let misc = dict.get("misc").unwrap();
        assert_eq!(misc.iter().collect::<Vec<_>>(), vec![("cube", &bits("00"))]);
        let misc_2 = dict.get("misc_2").unwrap();
        assert_eq!(misc_2.iter().collect::<Vec<_>>(), vec![("grass", &bits("11"))]);
        assert_eq!(dict.lookup("giraffe").map(|m| m.0), Some("animals"));
    }

    #[test]
    fn test_words_owned_elsewhere() {
        let dict = sample_dictionary();
        let incoming = mappings(&[("giraffe", "1"), ("pen", "00"), ("cube", "01")], true);
        assert_eq!(
            dict.words_owned_elsewhere("animals", &incoming),
            vec!["pen".to_string()]
        );
        assert_eq!(
            dict.words_owned_elsewhere("misc", &incoming),
            vec!["giraffe".to_string(), "pen".to_string()]
        );
        assert!(WordTypeDictionary::empty()
            .words_owned_elsewhere("misc", &incoming)
            .is_empty());
    }

    #[test]
    fn test_remove_words() {
        let mut dict = sample_dictionary();
        assert_eq!(dict.remove_words(Vec::<String>::new()), 0);
        assert_eq!(dict.remove_words(["penguin", "tiger", "pen", "unknown"]), 3);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("animals").map(MappingDictionary::len), Some(1));

        assert_eq!(dict.remove_words(["giraffe"]), 1);
        assert_eq!(dict.word_type_names(), vec!["stationery"]);

        dict.remove_words(["pencil", "paper"]);
        assert!(dict.is_empty());
        assert_eq!(dict.remove_words(["pencil"]), 0);
    }

    #[test]
    fn test_remove_word_types() {
        let mut dict = sample_dictionary();
        assert_eq!(dict.remove_word_types(["animals", "nothing"]), 1);
        assert_eq!(dict.word_type_names(), vec!["stationery"]);
        assert_eq!(dict.remove_word_types(["stationery"]), 1);
        assert!(dict.is_empty());
    }

    #[test]
    fn test_serialise() {
        let dict = sample_dictionary();
        let value = serde_json::to_value(&dict).unwrap();
        assert_eq!(value["animals"]["encode_spaces"], true);
        assert_eq!(value["animals"]["mappings"]["penguin"], "00");
        assert_eq!(value["stationery"]["encode_spaces"], false);
        assert!(value["stationery"]["mappings"].get("penguin").is_none());

        let back: WordTypeDictionary = serde_json::from_value(value).unwrap();
        assert_eq!(back, dict);
    }

    #[test]
    fn test_serialise_empty() {
        let dict = WordTypeDictionary::empty();
        assert_eq!(serde_json::to_string(&dict).unwrap(), "{}");
        let from_null: WordTypeDictionary = serde_json::from_str("null").unwrap();
        let from_empty: WordTypeDictionary = serde_json::from_str("{}").unwrap();
        assert!(from_null.is_empty());
        assert!(from_empty.is_empty());
    }
}
