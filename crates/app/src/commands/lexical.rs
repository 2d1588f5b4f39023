use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use stegano_core::analysis::read_mappings;
use stegano_core::coder::decode_cover_text;
use stegano_core::framing::DEFAULT_HEADER_BITS;
use stegano_core::metrics::ChainStats;
use stegano_core::persist::{load_chain, load_dictionary, read_text, save_chain, save_dictionary};
use stegano_core::{ExtendedCoder, MappingDictionary, MarkovChain, WordTypeDictionary};

use super::{read_bits, write_text, CommandExecutor};
use crate::config::{check_header_bits, CoderArgs, Config, RunSeed};

/// Markov-chain lexical coding.
#[derive(Subcommand, Debug)]
pub enum LexicalCommand {
    /// Add a `word,bits` list to a dictionary under one word-type
    AddWordMappings {
        /// Mapping list (`word,bits` lines)
        #[arg(long)]
        mappings: PathBuf,

        /// Dictionary file; created if missing
        #[arg(long)]
        dictionary: PathBuf,

        #[arg(long)]
        word_type: String,

        /// Words of this type are written without a leading space (punctuation)
        #[arg(long)]
        no_spaces: bool,
    },

    /// Remove whole word-types from a dictionary
    RemoveWordType {
        #[arg(long)]
        dictionary: PathBuf,

        #[arg(long = "word-type", required = true)]
        word_types: Vec<String>,
    },

    /// Remove individual words from a dictionary
    RemoveWords {
        #[arg(long)]
        dictionary: PathBuf,

        #[arg(long = "word", required = true)]
        words: Vec<String>,
    },

    /// Replace a dictionary with an empty one
    ResetDict {
        #[arg(long)]
        dictionary: PathBuf,
    },

    /// Create a linear placeholder chain
    ///
    /// With `--from-dictionary`, one state per word-type of that dictionary
    /// is created instead of generic `state_name{i}` states.
    CreateChain {
        #[arg(long)]
        chain: PathBuf,

        /// Number of states including the start state `s0`
        #[arg(long, default_value_t = 2, conflicts_with = "from_dictionary")]
        states: usize,

        #[arg(long)]
        from_dictionary: Option<PathBuf>,
    },

    /// Replace a chain with one that only has the start state
    ResetChain {
        #[arg(long)]
        chain: PathBuf,
    },

    /// Print the shape of a chain
    AnalyseChain {
        #[arg(long)]
        chain: PathBuf,
    },

    /// Hide a bitstring file in generated sentences
    EncodeBits {
        #[arg(long)]
        chain: PathBuf,

        #[arg(long)]
        dictionary: PathBuf,

        /// Secret message as a `0101` bitstring
        #[arg(long)]
        input: PathBuf,

        /// Cover text output
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        coder: CoderArgs,

        /// Seed for the walk and filler words
        #[arg(long)]
        seed: Option<u64>,

        /// Print an encode summary
        #[arg(long)]
        metrics: bool,
    },

    /// Recover the bits hidden in a cover text
    DecodeCover {
        #[arg(long)]
        dictionary: PathBuf,

        /// Cover text
        #[arg(long)]
        input: PathBuf,

        /// Bitstring output
        #[arg(long)]
        output: PathBuf,

        /// Width of the length header used when encoding
        #[arg(long, default_value_t = DEFAULT_HEADER_BITS)]
        header_bits: usize,
    },
}

impl CommandExecutor for LexicalCommand {
    fn execute(&self, config: &Config) -> Result<()> {
        match self {
            Self::AddWordMappings {
                mappings,
                dictionary,
                word_type,
                no_spaces,
            } => {
                if word_type.is_empty() {
                    bail!("word-type name is empty");
                }
                let mappings_path = config.path(mappings);
                let entries = read_mappings(&mappings_path).with_context(|| {
                    format!("failed to read mappings {}", mappings_path.display())
                })?;
                let listed = entries.len();
                let incoming = MappingDictionary::new(entries, !no_spaces);
                if incoming.len() < listed {
                    eprintln!(
                        "WARNING: {} of {listed} mappings were dropped as empty, \
                         containing a space, or repeating a word or code.",
                        listed - incoming.len()
                    );
                }

                let dict_path = config.path(dictionary);
                let mut wt_dict = load_or_empty(&dict_path)?;
                report_words_owned_elsewhere(&wt_dict.words_owned_elsewhere(word_type, &incoming));
                let mut word_types = BTreeMap::new();
                word_types.insert(word_type.clone(), incoming);
                let added = wt_dict.merge(word_types);
                println!("Added {added} mappings under word-type \"{word_type}\"");

                save_dict(&dict_path, &wt_dict)?;
            }

            Self::RemoveWordType {
                dictionary,
                word_types,
            } => {
                let dict_path = config.path(dictionary);
                let mut wt_dict = load_or_empty(&dict_path)?;
                if wt_dict.is_empty() {
                    println!("Given dictionary was empty.");
                    return Ok(());
                }
                let removed = wt_dict.remove_word_types(word_types);
                println!("Removed {removed} word-type(s) from dictionary.");
                save_dict(&dict_path, &wt_dict)?;
            }

            Self::RemoveWords { dictionary, words } => {
                let dict_path = config.path(dictionary);
                let mut wt_dict = load_or_empty(&dict_path)?;
                let removed = wt_dict.remove_words(words);
                println!("Removed {removed} word(s) from dictionary.");
                save_dict(&dict_path, &wt_dict)?;
            }

            Self::ResetDict { dictionary } => {
                println!("Word-type dictionary is now empty.");
                save_dict(&config.path(dictionary), &WordTypeDictionary::empty())?;
            }

            Self::CreateChain {
                chain,
                states,
                from_dictionary,
            } => {
                let markov_chain = match from_dictionary {
                    Some(dictionary) => {
                        let wt_dict = load_dict(&config.path(dictionary))?;
                        if wt_dict.is_empty() {
                            bail!("cannot derive a chain from an empty dictionary");
                        }
                        MarkovChain::linear(wt_dict.word_type_names())?
                    }
                    None => MarkovChain::placeholder(*states)?,
                };
                println!(
                    "Markov chain created with {} states.",
                    markov_chain.states().count()
                );
                save(&config.path(chain), &markov_chain)?;
            }

            Self::ResetChain { chain } => {
                println!("Markov chain is now empty.");
                save(&config.path(chain), &MarkovChain::empty())?;
            }

            Self::AnalyseChain { chain } => {
                let markov_chain = load(&config.path(chain))?;
                ChainStats::from_chain(&markov_chain)?.print_summary();
            }

            Self::EncodeBits {
                chain,
                dictionary,
                input,
                output,
                coder,
                seed,
                metrics,
            } => {
                let coder_config = coder.coder_config()?;
                let bits = read_bits(&config.path(input))?;
                let markov_chain = load(&config.path(chain))?;
                let wt_dict = load_dict(&config.path(dictionary))?;

                let seed = RunSeed::resolve(*seed);
                seed.print();
                println!(
                    "Encoding cover text with header length {}.",
                    coder_config.header_bits
                );
                let encoded = ExtendedCoder::new(&markov_chain, &wt_dict)
                    .with_config(coder_config)
                    .encode_message_with_rng(&bits, &mut seed.rng())?;

                let output_path = config.path(output);
                write_text(&output_path, &encoded.cover_text)?;
                println!("Cover text written to {}", output_path.display());
                if *metrics {
                    encoded.metrics.print_summary();
                }
            }

            Self::DecodeCover {
                dictionary,
                input,
                output,
                header_bits,
            } => {
                check_header_bits(*header_bits)?;
                let input_path = config.path(input);
                let cover_text = read_text(&input_path)
                    .with_context(|| format!("failed to read {}", input_path.display()))?;
                let wt_dict = load_dict(&config.path(dictionary))?;

                let decoded = decode_cover_text(&wt_dict, &cover_text, *header_bits)?;
                if decoded.has_leftover() {
                    eprintln!(
                        "WARNING: {} characters of cover text were not needed; \
                         the header length may not match the one used to encode.",
                        decoded.leftover.chars().count()
                    );
                }

                let output_path = config.path(output);
                write_text(&output_path, &decoded.bits.to_string())?;
                println!("Secret message written to {}", output_path.display());
            }
        }
        Ok(())
    }
}

fn report_words_owned_elsewhere(words: &[String]) {
    if let Some(message) = owned_elsewhere_warning(words) {
        eprintln!("{message}");
    }
}

fn owned_elsewhere_warning(words: &[String]) -> Option<String> {
    if words.is_empty() {
        return None;
    }
    Some(format!(
        "WARNING: {} word(s) already belong to another word-type and were not added: {}",
        words.len(),
        words.join(", ")
    ))
}

fn load_dict(path: &Path) -> Result<WordTypeDictionary> {
    let wt_dict = load_dictionary(path)
        .with_context(|| format!("failed to load dictionary {}", path.display()))?;
    println!("Word-type dictionary loaded.");
    Ok(wt_dict)
}

/// A dictionary file that does not exist yet is treated as empty.
fn load_or_empty(path: &Path) -> Result<WordTypeDictionary> {
    if !path.exists() {
        println!("No dictionary at {}, starting a new one.", path.display());
        return Ok(WordTypeDictionary::empty());
    }
    load_dict(path)
}

fn save_dict(path: &Path, wt_dict: &WordTypeDictionary) -> Result<()> {
    save_dictionary(path, wt_dict)
        .with_context(|| format!("failed to save dictionary {}", path.display()))?;
    println!("Saved to {}", path.display());
    Ok(())
}

fn load(path: &Path) -> Result<MarkovChain> {
    let chain =
        load_chain(path).with_context(|| format!("failed to load chain {}", path.display()))?;
    println!("Markov chain loaded.");
    Ok(chain)
}

fn save(path: &Path, chain: &MarkovChain) -> Result<()> {
    save_chain(path, chain).with_context(|| format!("failed to save chain {}", path.display()))?;
    println!("Saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stegano_core::BitString;

    fn dictionary_file(dir: &Path) -> PathBuf {
        let path = dir.join("dict.json");
        let mut word_types = BTreeMap::new();
        let nouns = ["dog", "cat"]
            .iter()
            .zip(["0", "1"])
            .map(|(word, code)| (*word, code.parse::<BitString>().unwrap()));
        word_types.insert("nouns".to_string(), MappingDictionary::new(nouns, true));
        save_dictionary(&path, &WordTypeDictionary::new(word_types)).unwrap();
        path
    }

    #[test]
    fn test_owned_elsewhere_warning() {
        assert_eq!(owned_elsewhere_warning(&[]), None);
        let message = owned_elsewhere_warning(&["dog".to_string(), "cat".to_string()]).unwrap();
        assert!(message.contains("2 word(s)"));
        assert!(message.ends_with("dog, cat"));
    }

    #[test]
    fn test_add_word_mappings_skips_words_of_other_types() {
        let dir = tempfile::tempdir().unwrap();
        let dict_path = dictionary_file(dir.path());
        std::fs::write(dir.path().join("verbs.txt"), "dog,00\nruns,01\njumps,10\n").unwrap();

        let command = LexicalCommand::AddWordMappings {
            mappings: PathBuf::from("verbs.txt"),
            dictionary: PathBuf::from("dict.json"),
            word_type: "verbs".to_string(),
            no_spaces: false,
        };
        command
            .execute(&Config::new(Some(dir.path().to_path_buf())))
            .unwrap();

        let wt_dict = load_dictionary(&dict_path).unwrap();
        assert_eq!(wt_dict.lookup("dog").map(|m| m.0), Some("nouns"));
        assert_eq!(wt_dict.get("verbs").map(MappingDictionary::len), Some(2));
        assert_eq!(wt_dict.word_count(), 4);
    }
}
