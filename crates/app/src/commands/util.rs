use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use stegano_core::analysis::{analyse_sample, write_analysis};
use stegano_core::persist::read_text;
use stegano_core::BitString;

use super::{read_bits, write_text, CommandExecutor};
use crate::config::{Config, RunSeed};
use crate::crypto::{decrypt_bits, encrypt_bits, generate_key};
use crate::input_gen::write_payload_file;

/// Analysis, encryption and conversion helpers.
#[derive(Subcommand, Debug)]
pub enum UtilCommand {
    /// Count the symbols of a sample text into a frequency analysis file
    AnalyseSample {
        /// Sample text
        #[arg(long)]
        input: PathBuf,

        /// Analysis output (`symbol,frequency` lines)
        #[arg(long)]
        output: PathBuf,

        /// Characters per symbol
        #[arg(long, default_value_t = 1)]
        symbol_len: usize,
    },

    /// Encrypt a bitstring file with a passphrase
    Encrypt {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Passphrase, e.g. one made by `generate-key`
        #[arg(long)]
        key: String,
    },

    /// Decrypt a bitstring file made by `encrypt`
    Decrypt {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long)]
        key: String,
    },

    /// Print a new random passphrase
    GenerateKey,

    /// Convert a UTF-8 text file to a bitstring file
    CharEncode {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Convert a bitstring file back to UTF-8 text
    CharDecode {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Write a random bitstring file for trying out the codecs
    RandomBits {
        #[arg(long)]
        output: PathBuf,

        /// Number of bits
        #[arg(long, default_value_t = 256)]
        length: usize,

        #[arg(long)]
        seed: Option<u64>,
    },
}

impl CommandExecutor for UtilCommand {
    fn execute(&self, config: &Config) -> Result<()> {
        match self {
            Self::AnalyseSample {
                input,
                output,
                symbol_len,
            } => {
                if *symbol_len < 1 {
                    bail!("symbol length must be at least 1");
                }
                let input_path = config.path(input);
                println!(
                    "Analysing input file {} with symbol length {symbol_len}.",
                    input_path.display()
                );
                let sample = read_text(&input_path)
                    .with_context(|| format!("failed to read {}", input_path.display()))?;
                let analysis = analyse_sample(&sample, *symbol_len)?;

                let output_path = config.path(output);
                write_analysis(&output_path, &analysis)
                    .with_context(|| format!("failed to write {}", output_path.display()))?;
                println!(
                    "Frequency analysis of {} symbols written to {}",
                    analysis.len(),
                    output_path.display()
                );
            }

            Self::Encrypt { input, output, key } => {
                let plaintext = read_bits(&config.path(input))?;
                let ciphertext = encrypt_bits(&plaintext, key)?;
                println!("Input encrypted.");

                let output_path = config.path(output);
                write_text(&output_path, &ciphertext.to_string())?;
                println!("Ciphertext written to {}", output_path.display());
            }

            Self::Decrypt { input, output, key } => {
                let ciphertext = read_bits(&config.path(input))?;
                let plaintext = decrypt_bits(&ciphertext, key)?;
                println!("Input decrypted.");

                let output_path = config.path(output);
                write_text(&output_path, &plaintext.to_string())?;
                println!("Plaintext written to {}", output_path.display());
            }

            Self::GenerateKey => {
                println!("SAVE THE FOLLOWING KEY EXACTLY AS WRITTEN:");
                println!("{}", generate_key());
            }

            Self::CharEncode { input, output } => {
                let input_path = config.path(input);
                let text = read_text(&input_path)
                    .with_context(|| format!("failed to read {}", input_path.display()))?;
                if text.is_empty() {
                    bail!("{} is empty", input_path.display());
                }

                let output_path = config.path(output);
                write_text(&output_path, &BitString::from_text(&text).to_string())?;
                println!("Bits written to {}", output_path.display());
            }

            Self::CharDecode { input, output } => {
                let bits = read_bits(&config.path(input))?;
                if bits.len() % 8 != 0 {
                    eprintln!(
                        "WARNING: dropping {} bits after the last whole byte.",
                        bits.len() % 8
                    );
                }
                let text = bits
                    .trim_to_bytes()
                    .to_text()
                    .context("bits do not decode to UTF-8 text")?;

                let output_path = config.path(output);
                write_text(&output_path, &text)?;
                println!("Text written to {}", output_path.display());
            }

            Self::RandomBits {
                output,
                length,
                seed,
            } => {
                if *length == 0 {
                    bail!("length must be at least 1");
                }
                let seed = RunSeed::resolve(*seed);
                seed.print();

                let output_path = config.path(output);
                write_payload_file(&output_path, seed.value, *length)
                    .with_context(|| format!("failed to write {}", output_path.display()))?;
                println!("{length} random bits written to {}", output_path.display());
            }
        }
        Ok(())
    }
}
