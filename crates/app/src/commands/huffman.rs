use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use stegano_core::analysis::{read_analysis, write_mappings};
use stegano_core::metrics::TreeStats;
use stegano_core::persist::{load_tree, read_text, save_tree};
use stegano_core::{BitString, HuffmanTree};

use super::{read_bits, write_text, CommandExecutor};
use crate::config::Config;

/// Reverse-Huffman coding.
#[derive(Subcommand, Debug)]
pub enum HuffmanCommand {
    /// Build a tree from a frequency analysis file
    CreateTree {
        /// Frequency analysis (`symbol,frequency` lines)
        #[arg(long)]
        analysis: PathBuf,

        /// Output tree file
        #[arg(long)]
        tree: PathBuf,
    },

    /// Hide a bitstring file in a cover text
    EncodeBits {
        #[arg(long)]
        tree: PathBuf,

        /// Secret message as a `0101` bitstring
        #[arg(long)]
        input: PathBuf,

        /// Cover text output
        #[arg(long)]
        output: PathBuf,
    },

    /// Recover the bits hidden in a cover text
    DecodeCover {
        #[arg(long)]
        tree: PathBuf,

        /// Cover text
        #[arg(long)]
        input: PathBuf,

        /// Bitstring output
        #[arg(long)]
        output: PathBuf,

        /// Characters per symbol in the cover text
        #[arg(long)]
        symbol_len: usize,
    },

    /// Write every leaf as a `word,bits` mapping, shortest codes first
    ExportMappings {
        #[arg(long)]
        tree: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Print code-length statistics of a tree
    AnalyseTree {
        #[arg(long)]
        tree: PathBuf,
    },
}

impl CommandExecutor for HuffmanCommand {
    fn execute(&self, config: &Config) -> Result<()> {
        match self {
            Self::CreateTree { analysis, tree } => {
                let analysis_path = config.path(analysis);
                let tree_path = config.path(tree);

                let frequencies = read_analysis(&analysis_path).with_context(|| {
                    format!("failed to read analysis {}", analysis_path.display())
                })?;
                let huffman_tree = HuffmanTree::from_frequencies(frequencies)
                    .context("failed to build Huffman tree")?;
                println!("Huffman tree created with {} symbols.", huffman_tree.leaf_count());

                save_tree(&tree_path, &huffman_tree)
                    .with_context(|| format!("failed to save tree {}", tree_path.display()))?;
                println!("Saved to {}", tree_path.display());
            }

            Self::EncodeBits { tree, input, output } => {
                let bits = read_bits(&config.path(input))?;
                let huffman_tree = load(config, tree)?;

                let encoding = huffman_tree.encode_bits_as_symbols(&bits)?;
                if !encoding.padding.is_empty() {
                    println!(
                        "Message padded with {} zero bits to end on a symbol.",
                        encoding.padding.len()
                    );
                }

                let output_path = config.path(output);
                write_text(&output_path, &encoding.symbols)?;
                println!("Cover text written to {}", output_path.display());
            }

            Self::DecodeCover {
                tree,
                input,
                output,
                symbol_len,
            } => {
                if *symbol_len < 1 {
                    bail!("symbol length must be at least 1");
                }
                let input_path = config.path(input);
                let contents = read_text(&input_path)
                    .with_context(|| format!("failed to read {}", input_path.display()))?;
                let cover_text = strip_line_terminator(&contents);
                if cover_text.is_empty() {
                    bail!("{} is empty", input_path.display());
                }

                let huffman_tree = load(config, tree)?;
                if !huffman_tree.has_symbol_length(*symbol_len) {
                    bail!("the Huffman tree has no symbols of length {symbol_len}");
                }

                let bits = huffman_tree.decode_symbols_as_bits(cover_text, *symbol_len)?;
                let output_path = config.path(output);
                write_text(&output_path, &bits.to_string())?;
                println!("Secret message written to {}", output_path.display());
            }

            Self::ExportMappings { tree, output } => {
                let huffman_tree = load(config, tree)?;
                let mappings: Vec<(String, BitString)> = huffman_tree
                    .symbol_table()?
                    .into_iter()
                    .map(|(symbol, code)| (symbol.to_lowercase(), code))
                    .collect();

                let output_path = config.path(output);
                write_mappings(&output_path, &mappings)
                    .with_context(|| format!("failed to write {}", output_path.display()))?;
                println!("{} mappings written to {}", mappings.len(), output_path.display());
            }

            Self::AnalyseTree { tree } => {
                let huffman_tree = load(config, tree)?;
                TreeStats::from_tree(&huffman_tree)?.print_summary();
            }
        }
        Ok(())
    }
}

/// Drop one trailing line ending added by an editor. Analysis strips
/// whitespace, so no tree symbol ends with one.
fn strip_line_terminator(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

fn load(config: &Config, tree: &Path) -> Result<HuffmanTree> {
    let path = config.path(tree);
    let tree = load_tree(&path).with_context(|| format!("failed to load tree {}", path.display()))?;
    println!("Huffman tree loaded.");
    Ok(tree)
}
