//! Configuration for the stegano application.
//!
//! Resolves command-line options to concrete file paths and coder settings.
//!
//! # Philosophy
//!
//! Every option that affects the output has a default, and any default that
//! is random (the walk seed) is printed so a run can be reproduced.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{ensure, Result};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use stegano_core::framing::{DEFAULT_HEADER_BITS, MAX_HEADER_BITS};
use stegano_core::CoderConfig;

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Directory prefixed to every relative file name
    pub subfolder: Option<PathBuf>,
}

impl Config {
    pub fn new(subfolder: Option<PathBuf>) -> Self {
        Self { subfolder }
    }

    /// Resolve a file name against the subfolder. Absolute paths are kept.
    pub fn path(&self, name: &Path) -> PathBuf {
        match &self.subfolder {
            Some(dir) if name.is_relative() => dir.join(name),
            _ => name.to_path_buf(),
        }
    }
}

/// Lexical coder options.
#[derive(Args, Debug, Clone)]
pub struct CoderArgs {
    /// Width of the length header in bits; encoder and decoder must agree
    #[arg(long, default_value_t = DEFAULT_HEADER_BITS)]
    pub header_bits: usize,

    /// Stop as soon as the message is written instead of finishing the sentence
    #[arg(long)]
    pub no_padding: bool,

    /// Leave the first word of the cover text in lower case
    #[arg(long)]
    pub no_capitalise: bool,
}

impl CoderArgs {
    /// Check the options and turn them into a core coder configuration.
    pub fn coder_config(&self) -> Result<CoderConfig> {
        check_header_bits(self.header_bits)?;
        Ok(CoderConfig {
            header_bits: self.header_bits,
            pad_text: !self.no_padding,
            capitalise_start: !self.no_capitalise,
        })
    }
}

impl Default for CoderArgs {
    fn default() -> Self {
        Self {
            header_bits: DEFAULT_HEADER_BITS,
            no_padding: false,
            no_capitalise: false,
        }
    }
}

pub fn check_header_bits(header_bits: usize) -> Result<()> {
    ensure!(
        (1..=MAX_HEADER_BITS).contains(&header_bits),
        "header length must be between 1 and {MAX_HEADER_BITS} bits, got {header_bits}"
    );
    Ok(())
}

/// Seed for every random choice of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSeed {
    pub value: u64,
    /// True if the seed was taken from the clock rather than the command line
    pub generated: bool,
}

impl RunSeed {
    /// Use the given seed, or derive one from the current time.
    pub fn resolve(seed: Option<u64>) -> Self {
        match seed {
            Some(value) => Self {
                value,
                generated: false,
            },
            None => Self {
                value: time_seed(),
                generated: true,
            },
        }
    }

    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.value)
    }

    /// Print the seed if it was generated, so the run can be repeated.
    pub fn print(&self) {
        if self.generated {
            println!("Seed: {} (pass --seed {} to reproduce)", self.value, self.value);
        }
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
