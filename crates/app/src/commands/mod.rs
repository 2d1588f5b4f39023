//! Command groups of the `stegano` binary.
//!
//! Each group is a clap subcommand enum implementing `CommandExecutor`.

mod huffman;
mod lexical;
mod util;

pub use huffman::HuffmanCommand;
pub use lexical::LexicalCommand;
pub use util::UtilCommand;

use std::path::Path;

use anyhow::{bail, Context, Result};

use stegano_core::persist::{read_text, write_atomic};
use stegano_core::BitString;

use crate::config::Config;

/// Runs one parsed command against the resolved configuration.
pub trait CommandExecutor {
    fn execute(&self, config: &Config) -> Result<()>;
}

/// Read a `0101` bitstring file. Surrounding whitespace is ignored.
fn read_bits(path: &Path) -> Result<BitString> {
    let text = read_text(path).with_context(|| format!("failed to read {}", path.display()))?;
    let bits: BitString = text
        .trim()
        .parse()
        .with_context(|| format!("{} does not hold a valid bitstring", path.display()))?;
    if bits.is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(bits)
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    write_atomic(path, text.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))
}
