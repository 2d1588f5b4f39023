//! Integration tests for the full stegano pipelines.
//!
//! These tests verify end-to-end behavior: sample text -> analysis -> tree ->
//! file -> encode -> decode, and dictionary + chain -> files -> encode ->
//! decode, with verification that the recovered bits match the input.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;

use stegano_core::{
    analysis::{analyse_sample, read_analysis, read_mappings, write_analysis, write_mappings},
    coder::decode_cover_text,
    metrics::TreeStats,
    persist::{load_chain, load_dictionary, load_tree, save_chain, save_dictionary, save_tree},
    BitString, CoderConfig, ExtendedCoder, HuffmanTree, MappingDictionary, MarkovChain,
    WordTypeDictionary,
};

const SAMPLE: &str = "It was the best of times, it was the worst of times,\n\
    it was the age of wisdom, it was the age of foolishness,\n\
    it was the epoch of belief, it was the epoch of incredulity,\n\
    it was the season of Light, it was the season of Darkness.\n";

fn random_bits(rng: &mut ChaCha8Rng, len: usize) -> BitString {
    (0..len).map(|_| rng.gen::<bool>()).collect()
}

fn bits(s: &str) -> BitString {
    s.parse().unwrap()
}

fn mappings(pairs: &[(&str, &str)], encode_spaces: bool) -> MappingDictionary {
    MappingDictionary::new(pairs.iter().map(|(w, b)| (*w, bits(b))), encode_spaces)
}

fn story_dictionary() -> WordTypeDictionary {
    let mut word_types = BTreeMap::new();
    word_types.insert(
        "determiners".to_string(),
        mappings(&[("the", "0"), ("a", "10"), ("every", "110"), ("some", "111")], true),
    );
    word_types.insert(
        "adjectives".to_string(),
        mappings(&[("quick", "00"), ("lazy", "01"), ("brown", "10"), ("clever", "11")], true),
    );
    word_types.insert(
        "nouns".to_string(),
        mappings(
            &[
                ("fox", "00"),
                ("dog", "01"),
                ("cat", "100"),
                ("owl", "101"),
                ("hen", "11"),
            ],
            true,
        ),
    );
    word_types.insert(
        "verbs".to_string(),
        mappings(&[("sleeps", "0"), ("runs", "10"), ("sings", "11")], true),
    );
    word_types.insert(
        "punctuation".to_string(),
        mappings(&[(".", "0"), ("!", "1")], false),
    );
    WordTypeDictionary::new(word_types)
}

fn story_chain() -> MarkovChain {
    let mut chain =
        MarkovChain::new(["determiners", "adjectives", "nouns", "verbs", "punctuation"]);
    chain
        .set_transitions([
            ("s0", "determiners", 1.0),
            ("determiners", "adjectives", 0.5),
            ("determiners", "nouns", 0.5),
            ("adjectives", "nouns", 1.0),
            ("nouns", "verbs", 1.0),
            ("verbs", "punctuation", 1.0),
            ("punctuation", "s0", 1.0),
        ])
        .unwrap();
    chain
}

/// Sample text -> analysis file -> tree file -> encode -> decode.
#[test]
fn test_huffman_pipeline() {
    let dir = tempdir().unwrap();
    let analysis_path = dir.path().join("analysis.txt");
    let tree_path = dir.path().join("tree.json");

    let analysis = analyse_sample(SAMPLE, 3).unwrap();
    write_analysis(&analysis_path, &analysis).unwrap();
    let reloaded = read_analysis(&analysis_path).unwrap();
    assert_eq!(reloaded, analysis);

    let tree = HuffmanTree::from_frequencies(reloaded).unwrap();
    save_tree(&tree_path, &tree).unwrap();
    let tree = load_tree(&tree_path).unwrap();
    assert!(tree.has_symbol_length(3));

    let stats = TreeStats::from_tree(&tree).unwrap();
    assert_eq!(stats.symbol_count, analysis.len());

    let mut rng = ChaCha8Rng::seed_from_u64(17);
    for len in [1, 9, 64, 500] {
        let input = random_bits(&mut rng, len);
        let encoding = tree.encode_bits_as_symbols(&input).unwrap();
        assert_eq!(encoding.symbols.chars().count() % 3, 0);

        let decoded = tree.decode_symbols_as_bits(&encoding.symbols, 3).unwrap();
        assert_eq!(decoded, input.concat(&encoding.padding));
    }
}

/// Text message -> bits -> Huffman symbols -> bits -> text.
#[test]
fn test_huffman_text_message() {
    let tree = HuffmanTree::from_frequencies(analyse_sample(SAMPLE, 1).unwrap()).unwrap();
    let message = "meet at dawn";
    let input = BitString::from_text(message);

    let encoding = tree.encode_bits_as_symbols(&input).unwrap();
    let decoded = tree.decode_symbols_as_bits(&encoding.symbols, 1).unwrap();
    let decoded = decoded.slice(0..input.len());
    assert_eq!(decoded.to_text().unwrap(), message);
}

/// Mapping list files -> dictionary file + chain file -> encode -> decode.
#[test]
fn test_lexical_pipeline_through_files() {
    let dir = tempdir().unwrap();
    let dict_path = dir.path().join("dict.json");
    let chain_path = dir.path().join("chain.json");

    let source = story_dictionary();
    let mut dictionary = WordTypeDictionary::empty();
    for (name, word_type) in source.iter() {
        let list_path = dir.path().join(format!("{name}.txt"));
        let entries: Vec<(String, BitString)> = word_type
            .iter()
            .map(|(word, code)| (word.to_string(), code.clone()))
            .collect();
        write_mappings(&list_path, &entries).unwrap();

        let mut incoming = BTreeMap::new();
        incoming.insert(
            name.to_string(),
            MappingDictionary::new(read_mappings(&list_path).unwrap(), word_type.encode_spaces()),
        );
        dictionary.merge(incoming);
    }
    assert_eq!(dictionary, source);

    save_dictionary(&dict_path, &dictionary).unwrap();
    save_chain(&chain_path, &story_chain()).unwrap();
    let dictionary = load_dictionary(&dict_path).unwrap();
    let chain = load_chain(&chain_path).unwrap();

    let coder = ExtendedCoder::new(&chain, &dictionary);
    let mut rng = ChaCha8Rng::seed_from_u64(4242);
    for len in 1..=200 {
        let input = random_bits(&mut rng, len);
        let encoded = coder.encode_message_with_rng(&input, &mut rng).unwrap();
        let decoded = coder.decode_cover_text(&encoded.cover_text).unwrap();
        assert_eq!(decoded.bits, input, "cover text: {}", encoded.cover_text);
    }
}

/// A text secret survives the lexical codec with several header widths.
#[test]
fn test_lexical_text_message() {
    let chain = story_chain();
    let dictionary = story_dictionary();
    let message = "The eagle has landed.";
    let input = BitString::from_text(message);

    for header_bits in [9, 16, 20, 32] {
        let config = CoderConfig {
            header_bits,
            ..CoderConfig::default()
        };
        let coder = ExtendedCoder::new(&chain, &dictionary).with_config(config);
        let encoded = coder
            .encode_message_with_rng(&input, &mut ChaCha8Rng::seed_from_u64(header_bits as u64))
            .unwrap();
        assert!(encoded.metrics.bits_per_word() > 0.0);

        let decoded = decode_cover_text(&dictionary, &encoded.cover_text, header_bits).unwrap();
        assert_eq!(decoded.bits.to_text().unwrap(), message);
    }
}

/// Many concurrent encodes can share one chain and dictionary.
#[test]
fn test_shared_chain_across_threads() {
    let chain = story_chain();
    let dictionary = story_dictionary();

    std::thread::scope(|scope| {
        for seed in 0..4u64 {
            let chain = &chain;
            let dictionary = &dictionary;
            scope.spawn(move || {
                let coder = ExtendedCoder::new(chain, dictionary);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let input = random_bits(&mut rng, 100);
                let encoded = coder.encode_message_with_rng(&input, &mut rng).unwrap();
                assert_eq!(coder.decode_cover_text(&encoded.cover_text).unwrap().bits, input);
            });
        }
    });
}

/// Placeholder chains only need a dictionary with matching word-types.
#[test]
fn test_placeholder_chain_with_generated_dictionary() {
    let chain = MarkovChain::placeholder(4).unwrap();
    let mut word_types = BTreeMap::new();
    for i in 1..4 {
        let words = [
            (format!("alpha{i}"), bits("00")),
            (format!("beta{i}"), bits("01")),
            (format!("gamma{i}"), bits("1")),
        ];
        word_types.insert(format!("word_type{i}"), MappingDictionary::new(words, true));
    }
    let dictionary = WordTypeDictionary::new(word_types);
    let coder = ExtendedCoder::new(&chain, &dictionary);

    let input = bits("1100101011110000");
    let encoded = coder
        .encode_message_with_rng(&input, &mut ChaCha8Rng::seed_from_u64(8))
        .unwrap();
    assert!(encoded.cover_text.starts_with(['A', 'B', 'G']));
    assert_eq!(coder.decode_cover_text(&encoded.cover_text).unwrap().bits, input);
}
