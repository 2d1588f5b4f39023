//! Loading and saving trees, chains and dictionaries as JSON files.
//!
//! Saves go through a temporary file in the destination directory that is
//! then renamed over the target, so a crash never leaves a half-written file.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::huffman::{HuffmanTree, SerialNode};
use crate::markov::{MarkovChain, SerialChain};
use crate::wtdict::WordTypeDictionary;

/// Write `bytes` to `path` atomically, creating parent directories.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let mut temp_file = NamedTempFile::new_in(parent_dir)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Read a whole UTF-8 text file.
pub fn read_text(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Deserialize a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Serialize `value` as pretty-printed JSON and save it atomically.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Load and structurally check a Huffman tree.
pub fn load_tree(path: &Path) -> Result<HuffmanTree> {
    let serial: SerialNode = load_json(path)?;
    HuffmanTree::from_serial(serial)
}

pub fn save_tree(path: &Path, tree: &HuffmanTree) -> Result<()> {
    save_json(path, &tree.to_serial())
}

/// Load and validate a Markov chain.
pub fn load_chain(path: &Path) -> Result<MarkovChain> {
    let serial: SerialChain = load_json(path)?;
    MarkovChain::from_serial(serial)
}

pub fn save_chain(path: &Path, chain: &MarkovChain) -> Result<()> {
    save_json(path, &chain.to_serial())
}

pub fn load_dictionary(path: &Path) -> Result<WordTypeDictionary> {
    load_json(path)
}

pub fn save_dictionary(path: &Path, dictionary: &WordTypeDictionary) -> Result<()> {
    save_json(path, dictionary)
}
