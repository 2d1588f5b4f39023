//! stegano: hide bits in plausible text
//!
//! Pipeline for the reverse-Huffman codec:
//! ```text
//! util analyse-sample -> huffman create-tree -> huffman encode-bits
//!                                            -> huffman decode-cover
//! ```
//! and for the lexical codec:
//! ```text
//! lexical add-word-mappings -> lexical create-chain -> lexical encode-bits
//!                                                   -> lexical decode-cover
//! ```
//! Secrets can be encrypted with `util encrypt` before encoding and
//! decrypted with `util decrypt` after decoding.

mod commands;
mod config;
mod crypto;
mod input_gen;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{CommandExecutor, HuffmanCommand, LexicalCommand, UtilCommand};
use config::Config;

/// Steganographic text coding
#[derive(Parser, Debug)]
#[command(name = "stegano", version, about)]
struct Cli {
    /// Directory prefixed to every relative file name
    #[arg(long, global = true)]
    subfolder: Option<PathBuf>,

    #[command(subcommand)]
    group: Group,
}

#[derive(Subcommand, Debug)]
enum Group {
    /// Reverse-Huffman coding: cover text mimics a sample's symbol statistics
    #[command(subcommand)]
    Huffman(HuffmanCommand),

    /// Lexical coding: cover text is sentences from a word-type chain
    #[command(subcommand)]
    Lexical(LexicalCommand),

    /// Text analysis, encryption and bit conversion
    #[command(subcommand)]
    Util(UtilCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::new(cli.subfolder);

    match &cli.group {
        Group::Huffman(command) => command.execute(&config),
        Group::Lexical(command) => command.execute(&config),
        Group::Util(command) => command.execute(&config),
    }
}
