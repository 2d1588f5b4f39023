//! Frequency analysis of sample text, and the plain-text list files.
//!
//! Two line-oriented formats are used alongside the JSON files:
//!
//! ```text
//! analysis file:   <symbol>,<frequency>    most frequent first
//! mappings file:   <word>,<bits>           e.g. "the,01"
//! ```
//!
//! Lines are split on the LAST comma, so a symbol may itself contain commas.

use std::collections::BTreeMap;
use std::path::Path;

use crate::bits::BitString;
use crate::error::{Error, FramingError, Result};
use crate::persist::{read_text, write_atomic};

const SEPARATOR: char = ',';

/// Count every overlapping substring of `string_length` characters.
///
/// Newlines and tabs are removed first. The result is ordered most frequent
/// first, ties broken by symbol.
pub fn analyse_sample(text: &str, string_length: usize) -> Result<Vec<(String, u64)>> {
    if string_length == 0 {
        return Err(FramingError::InvalidSymbolLength.into());
    }

    let chars: Vec<char> = text.chars().filter(|c| *c != '\n' && *c != '\t').collect();
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for window in chars.windows(string_length) {
        *counts.entry(window.iter().collect()).or_insert(0) += 1;
    }
    log::debug!(
        "sample has {} symbols of length {string_length}",
        chars.len().saturating_sub(string_length - 1)
    );

    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|(a_symbol, a_count), (b_symbol, b_count)| {
        b_count.cmp(a_count).then_with(|| a_symbol.cmp(b_symbol))
    });
    Ok(entries)
}

/// Scale frequencies so they sum to 1.
pub fn normalise_frequencies(entries: &[(String, u64)]) -> Vec<(String, f64)> {
    let total: u64 = entries.iter().map(|(_, count)| count).sum();
    if total == 0 {
        return Vec::new();
    }
    entries
        .iter()
        .map(|(symbol, count)| (symbol.clone(), *count as f64 / total as f64))
        .collect()
}

/// Render an analysis as `symbol,frequency` lines.
pub fn format_analysis(entries: &[(String, u64)]) -> String {
    entries
        .iter()
        .map(|(symbol, count)| format!("{symbol}{SEPARATOR}{count}\n"))
        .collect()
}

/// Parse `symbol,frequency` lines.
///
/// Blank lines are ignored and lines with a frequency below 1 are skipped
/// with a warning.
///
/// # Errors
/// `Error::Config` naming the line if it has no separator, an empty symbol,
/// or a frequency that is not an integer.
pub fn parse_analysis(text: &str) -> Result<Vec<(String, u64)>> {
    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let (symbol, frequency) = split_line(line, number)?;
        let frequency: i64 = frequency.trim().parse().map_err(|_| {
            Error::Config(format!("line {}: frequency {frequency:?} is not an integer", number + 1))
        })?;
        match u64::try_from(frequency) {
            Ok(frequency) if frequency > 0 => entries.push((symbol.to_string(), frequency)),
            _ => log::warn!("line {}: skipping {line:?}, frequency must be positive", number + 1),
        }
    }
    Ok(entries)
}

/// Render `word,bits` lines.
pub fn format_mappings(entries: &[(String, BitString)]) -> String {
    entries
        .iter()
        .map(|(word, code)| format!("{word}{SEPARATOR}{code}\n"))
        .collect()
}

/// Parse `word,bits` lines.
pub fn parse_mappings(text: &str) -> Result<Vec<(String, BitString)>> {
    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let (word, code) = split_line(line, number)?;
        let code: BitString = code.trim().parse().map_err(|err| {
            Error::Config(format!("line {}: {code:?} is not a bitstring: {err}", number + 1))
        })?;
        entries.push((word.to_string(), code));
    }
    Ok(entries)
}

fn split_line(line: &str, number: usize) -> Result<(&str, &str)> {
    match line.rsplit_once(SEPARATOR) {
        Some((head, tail)) if !head.is_empty() => Ok((head, tail)),
        _ => Err(Error::Config(format!("line {}: malformed entry {line:?}", number + 1))),
    }
}

pub fn read_analysis(path: &Path) -> Result<Vec<(String, u64)>> {
    parse_analysis(&read_text(path)?)
}

pub fn write_analysis(path: &Path, entries: &[(String, u64)]) -> Result<()> {
    write_atomic(path, format_analysis(entries).as_bytes())
}

pub fn read_mappings(path: &Path) -> Result<Vec<(String, BitString)>> {
    parse_mappings(&read_text(path)?)
}

pub fn write_mappings(path: &Path, entries: &[(String, BitString)]) -> Result<()> {
    write_atomic(path, format_mappings(entries).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyse_sample() {
        let entries = analyse_sample("abab\ta\nb", 2).unwrap();
        // "ababab" after stripping
        assert_eq!(entries, vec![("ab".to_string(), 3), ("ba".to_string(), 2)]);

        let entries = analyse_sample("hello", 1).unwrap();
        assert_eq!(entries[0], ("l".to_string(), 2));
        assert_eq!(entries.len(), 4);

        assert!(analyse_sample("hi", 3).unwrap().is_empty());
        assert!(analyse_sample("hi", 0).is_err());
    }

    #[test]
    fn test_analysis_format_round_trip() {
        let entries = vec![("a,b".to_string(), 5), (" ".to_string(), 2)];
        let text = format_analysis(&entries);
        assert_eq!(text, "a,b,5\n ,2\n");
        assert_eq!(parse_analysis(&text).unwrap(), entries);
    }

    #[test]
    fn test_parse_analysis_skips_non_positive() {
        let entries = parse_analysis("x,3\ny,0\nz,-2\n\n").unwrap();
        assert_eq!(entries, vec![("x".to_string(), 3)]);
    }

    #[test]
    fn test_parse_analysis_rejects_malformed() {
        assert!(matches!(parse_analysis("novalue"), Err(Error::Config(_))));
        assert!(matches!(parse_analysis(",4"), Err(Error::Config(_))));
        assert!(matches!(parse_analysis("x,many"), Err(Error::Config(_))));
    }

    #[test]
    fn test_mappings() {
        let entries = parse_mappings("the,01\nevery,00\n\"hi\",1\n").unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ("the".to_string(), "01".parse().unwrap()));
        assert_eq!(format_mappings(&entries), "the,01\nevery,00\n\"hi\",1\n");
        assert!(parse_mappings("the,012").is_err());
    }

    #[test]
    fn test_normalise() {
        let entries = vec![("a".to_string(), 3), ("b".to_string(), 1)];
        let normalised = normalise_frequencies(&entries);
        assert_eq!(normalised, vec![("a".to_string(), 0.75), ("b".to_string(), 0.25)]);
        assert!(normalise_frequencies(&[]).is_empty());
    }
}
