//! Reverse-Huffman codec: bits in, plausible symbols out.
//!
//! A tree is built from (symbol, frequency) pairs exactly like a Huffman
//! compressor would build it, but it is used in the opposite direction: the
//! secret bits are treated as a sequence of path codes, and every leaf reached
//! emits its symbol. Frequent symbols sit near the root, so the generated text
//! mimics the symbol statistics of the analysed corpus.
//!
//! # Tree Layout
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to their children by index.
//! An internal node always has two children; the type makes a single child
//! unrepresentable, and trees loaded from disk are checked for it on the way
//! in. Every walk is iterative, so very deep trees cannot overflow the stack.
//!
//! # Determinism
//!
//! Construction repeatedly merges the two lowest-frequency subtrees. Among
//! equal frequencies, the subtree whose greatest symbol sorts last is taken
//! first, and the first subtree taken becomes the left child. Given the same
//! symbol set, the tree is identical on every run.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::bits::BitString;
use crate::error::{FramingError, LookupError, Result, StructuralError};

/// Index of a node in the tree arena.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Leaf { symbol: String, frequency: u64 },
    Internal { left: NodeId, right: NodeId },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    /// Root-to-node edge labels, set by `allocate_path_codes`
    path_code: Option<BitString>,
}

/// A subtree waiting in the construction queue.
#[derive(Debug)]
struct QueuedTree {
    frequency: u64,
    /// Greatest symbol in the subtree, used to break frequency ties
    key: String,
    node: NodeId,
}

impl PartialEq for QueuedTree {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTree {}

impl PartialOrd for QueuedTree {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTree {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse on frequency so the max-heap yields the rarest subtree;
        // among equals the greatest key comes out first.
        other
            .frequency
            .cmp(&self.frequency)
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// Result of encoding bits as symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEncoding {
    /// Concatenated leaf symbols
    pub symbols: String,
    /// Zero bits appended because the input ended mid-path
    pub padding: BitString,
}

/// Persisted tree record: `{value, path_code, left, right}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerialNode {
    pub value: Option<String>,
    pub path_code: Option<BitString>,
    pub left: Option<Box<SerialNode>>,
    pub right: Option<Box<SerialNode>>,
}

/// A binary Huffman tree over text symbols.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl HuffmanTree {
    /// Build a tree from (symbol, frequency) pairs.
    ///
    /// Repeated symbols have their frequencies summed. Path codes are not
    /// assigned; call [`allocate_path_codes`](Self::allocate_path_codes).
    ///
    /// # Errors
    /// Returns `StructuralError::EmptySymbolSet` if there are no symbols.
    pub fn build<I, S>(symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        for (symbol, frequency) in symbols {
            let total = totals.entry(symbol.into()).or_insert(0);
            *total = total.saturating_add(frequency);
        }
        if totals.is_empty() {
            return Err(StructuralError::EmptySymbolSet.into());
        }

        let mut nodes = Vec::with_capacity(totals.len() * 2 - 1);
        let mut queue = BinaryHeap::with_capacity(totals.len());
        for (symbol, frequency) in totals {
            queue.push(QueuedTree {
                frequency,
                key: symbol.clone(),
                node: nodes.len(),
            });
            nodes.push(Node {
                kind: NodeKind::Leaf { symbol, frequency },
                path_code: None,
            });
        }

        let root = loop {
            let first = queue.pop().ok_or(StructuralError::EmptySymbolSet)?;
            let Some(second) = queue.pop() else {
                break first.node;
            };

            let merged = QueuedTree {
                frequency: first.frequency.saturating_add(second.frequency),
                key: first.key.max(second.key),
                node: nodes.len(),
            };
            nodes.push(Node {
                kind: NodeKind::Internal {
                    left: first.node,
                    right: second.node,
                },
                path_code: None,
            });
            queue.push(merged);
        };

        Ok(Self { nodes, root })
    }

    /// Build a tree and assign its path codes in one step.
    pub fn from_frequencies<I, S>(symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut tree = Self::build(symbols)?;
        tree.allocate_path_codes();
        Ok(tree)
    }

    /// Assign every node the bit path from the root: left appends `0`,
    /// right appends `1`, and the root gets the empty code.
    pub fn allocate_path_codes(&mut self) {
        let mut stack = vec![(self.root, BitString::new())];
        while let Some((id, code)) = stack.pop() {
            if let NodeKind::Internal { left, right } = self.nodes[id].kind {
                let mut left_code = code.clone();
                left_code.push(false);
                let mut right_code = code.clone();
                right_code.push(true);
                stack.push((right, right_code));
                stack.push((left, left_code));
            }
            self.nodes[id].path_code = Some(code);
        }
    }

    /// Number of leaves (distinct symbols).
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::Leaf { .. }))
            .count()
    }

    /// Total number of nodes, leaves and internal.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            match self.nodes[id].kind {
                NodeKind::Leaf { .. } => deepest = deepest.max(depth),
                NodeKind::Internal { left, right } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
            }
        }
        deepest
    }

    /// True if any leaf symbol has exactly `symbol_length` characters.
    pub fn has_symbol_length(&self, symbol_length: usize) -> bool {
        self.nodes.iter().any(|node| match &node.kind {
            NodeKind::Leaf { symbol, .. } => symbol.chars().count() == symbol_length,
            NodeKind::Internal { .. } => false,
        })
    }

    /// Encode bits as a string of leaf symbols.
    ///
    /// Each step walks from the root following the next bits until a leaf is
    /// reached. If the bits run out mid-path, zero bits are appended until a
    /// leaf is reached; those bits are returned as `padding`.
    ///
    /// # Errors
    /// Returns `StructuralError::DegenerateTree` if the root is a leaf.
    pub fn encode_bits_as_symbols(&self, bits: &BitString) -> Result<SymbolEncoding> {
        if matches!(self.nodes[self.root].kind, NodeKind::Leaf { .. }) {
            return Err(StructuralError::DegenerateTree.into());
        }

        let mut symbols = String::new();
        let mut padding = BitString::new();
        let mut position = 0;

        while position < bits.len() {
            let mut node = self.root;
            loop {
                match &self.nodes[node].kind {
                    NodeKind::Leaf { symbol, .. } => {
                        symbols.push_str(symbol);
                        break;
                    }
                    NodeKind::Internal { left, right } => {
                        let bit = match bits.get(position) {
                            Some(bit) => bit,
                            None => {
                                padding.push(false);
                                false
                            }
                        };
                        position += 1;
                        node = if bit { *right } else { *left };
                    }
                }
            }
        }

        Ok(SymbolEncoding { symbols, padding })
    }

    /// Decode fixed-width symbols back into their path codes.
    ///
    /// The text is split every `symbol_length` characters; a short final
    /// chunk is padded with spaces before lookup.
    ///
    /// # Errors
    /// - `FramingError::InvalidSymbolLength` if `symbol_length` is 0
    /// - `StructuralError::MissingPathCode` if codes were never allocated
    /// - `LookupError::UnknownSymbol` if a chunk matches no leaf
    pub fn decode_symbols_as_bits(&self, text: &str, symbol_length: usize) -> Result<BitString> {
        if symbol_length == 0 {
            return Err(FramingError::InvalidSymbolLength.into());
        }

        let codes: HashMap<&str, &BitString> = self
            .leaves()
            .map(|(symbol, code)| {
                code.map(|code| (symbol, code))
                    .ok_or_else(|| StructuralError::MissingPathCode {
                        node: symbol.to_string(),
                    })
            })
            .collect::<std::result::Result<_, _>>()?;

        let chars: Vec<char> = text.chars().collect();
        let mut bits = BitString::new();
        for chunk in chars.chunks(symbol_length) {
            let mut symbol: String = chunk.iter().collect();
            for _ in chunk.len()..symbol_length {
                symbol.push(' ');
            }
            let code = codes
                .get(symbol.as_str())
                .ok_or(LookupError::UnknownSymbol(symbol.clone()))?;
            bits.extend(code);
        }

        Ok(bits)
    }

    /// Path codes of every leaf, ordered by (length, value).
    pub fn leaf_path_codes(&self) -> Result<Vec<BitString>> {
        Ok(self
            .symbol_table()?
            .into_iter()
            .map(|(_, code)| code)
            .collect())
    }

    /// (symbol, path code) for every leaf, ordered by (code length, code value).
    pub fn symbol_table(&self) -> Result<Vec<(String, BitString)>> {
        let mut table = self
            .leaves()
            .map(|(symbol, code)| {
                code.cloned()
                    .map(|code| (symbol.to_string(), code))
                    .ok_or_else(|| StructuralError::MissingPathCode {
                        node: symbol.to_string(),
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        table.sort_by(|(_, a), (_, b)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        Ok(table)
    }

    fn leaves(&self) -> impl Iterator<Item = (&str, Option<&BitString>)> {
        self.nodes.iter().filter_map(|node| match &node.kind {
            NodeKind::Leaf { symbol, .. } => Some((symbol.as_str(), node.path_code.as_ref())),
            NodeKind::Internal { .. } => None,
        })
    }

    /// Convert to the nested persisted record.
    pub fn to_serial(&self) -> SerialNode {
        let mut built: Vec<Option<SerialNode>> = (0..self.nodes.len()).map(|_| None).collect();
        let mut stack = vec![(self.root, false)];

        while let Some((id, expanded)) = stack.pop() {
            let node = &self.nodes[id];
            match node.kind {
                NodeKind::Leaf { ref symbol, .. } => {
                    built[id] = Some(SerialNode {
                        value: Some(symbol.clone()),
                        path_code: node.path_code.clone(),
                        left: None,
                        right: None,
                    });
                }
                NodeKind::Internal { left, right } if !expanded => {
                    stack.push((id, true));
                    stack.push((right, false));
                    stack.push((left, false));
                }
                NodeKind::Internal { left, right } => {
                    built[id] = Some(SerialNode {
                        value: None,
                        path_code: node.path_code.clone(),
                        left: built[left].take().map(Box::new),
                        right: built[right].take().map(Box::new),
                    });
                }
            }
        }

        built[self.root].take().unwrap_or_default()
    }

    /// Rebuild a tree from its persisted record, checking its structure.
    ///
    /// A record with no path codes at all gets fresh codes allocated. A
    /// record with codes must carry a correct code on every non-root node.
    ///
    /// # Errors
    /// Any `StructuralError`: single-child nodes, leaves without symbols,
    /// internal nodes with symbols, duplicate symbols, missing or wrong codes.
    pub fn from_serial(root: SerialNode) -> Result<Self> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut symbols = HashSet::new();
        let mut missing_code: Option<String> = None;
        let mut codes_seen = false;

        // (record, expected path, parent and whether this is its right child)
        let mut stack: Vec<(SerialNode, BitString, Option<(NodeId, bool)>)> =
            vec![(root, BitString::new(), None)];

        while let Some((record, path, parent)) = stack.pop() {
            let id = nodes.len();
            let label = if path.is_empty() {
                "root".to_string()
            } else {
                path.to_string()
            };

            match &record.path_code {
                Some(code) if *code != path => {
                    return Err(StructuralError::WrongPathCode {
                        path: label,
                        found: code.to_string(),
                    }
                    .into());
                }
                Some(_) => codes_seen = true,
                None if parent.is_some() && missing_code.is_none() => {
                    missing_code = Some(label.clone());
                }
                None => {}
            }

            let kind = match (record.left, record.right) {
                (None, None) => {
                    let symbol = record
                        .value
                        .ok_or(StructuralError::MisplacedSymbol { path: label })?;
                    if !symbols.insert(symbol.clone()) {
                        return Err(StructuralError::DuplicateSymbol(symbol).into());
                    }
                    NodeKind::Leaf {
                        symbol,
                        frequency: 0,
                    }
                }
                (Some(left), Some(right)) => {
                    if record.value.is_some() {
                        return Err(StructuralError::MisplacedSymbol { path: label }.into());
                    }
                    let mut left_path = path.clone();
                    left_path.push(false);
                    let mut right_path = path.clone();
                    right_path.push(true);
                    stack.push((*right, right_path, Some((id, true))));
                    stack.push((*left, left_path, Some((id, false))));
                    // Child indices are patched in when the children are visited.
                    NodeKind::Internal { left: 0, right: 0 }
                }
                _ => return Err(StructuralError::SingleChild { path: label }.into()),
            };

            nodes.push(Node {
                kind,
                path_code: record.path_code,
            });

            if let Some((parent_id, is_right)) = parent {
                if let NodeKind::Internal { left, right } = &mut nodes[parent_id].kind {
                    if is_right {
                        *right = id;
                    } else {
                        *left = id;
                    }
                }
            }
        }

        let mut tree = Self { nodes, root: 0 };
        match (codes_seen, missing_code) {
            (true, Some(node)) => return Err(StructuralError::MissingPathCode { node }.into()),
            (false, _) => tree.allocate_path_codes(),
            (true, None) => {
                tree.nodes[tree.root].path_code = Some(BitString::new());
            }
        }
        Ok(tree)
    }
}

/// Mean length of a set of path codes (0 for an empty set).
pub fn average_code_length(codes: &[BitString]) -> f64 {
    if codes.is_empty() {
        return 0.0;
    }
    codes.iter().map(BitString::len).sum::<usize>() as f64 / codes.len() as f64
}

/// Sum of `len(code) / 2^len(code)` over a set of path codes.
///
/// This weights each code length by the probability a uniformly random bit
/// stream selects that leaf.
pub fn expected_code_length(codes: &[BitString]) -> f64 {
    codes
        .iter()
        .map(|code| code.len() as f64 / 2f64.powi(code.len() as i32))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> BitString {
        s.parse().unwrap()
    }

    fn sample_symbols() -> Vec<(&'static str, u64)> {
        vec![
            ("stega", 10),
            ("tegan", 7),
            ("egana", 5),
            ("ganal", 5),
            ("analy", 5),
            ("nalys", 3),
            ("alysi", 3),
            ("lysis", 1),
        ]
    }

    fn sample_tree() -> HuffmanTree {
        HuffmanTree::from_frequencies(sample_symbols()).unwrap()
    }

    #[test]
    fn test_build_shape() {
        let tree = HuffmanTree::build(sample_symbols()).unwrap();
        assert_eq!(tree.leaf_count(), 8);
        // A full binary tree with n leaves has 2n - 1 nodes.
        assert_eq!(tree.node_count(), 15);
    }

    #[test]
    fn test_build_empty_fails() {
        let result = HuffmanTree::build(Vec::<(String, u64)>::new());
        assert!(matches!(
            result,
            Err(crate::error::Error::Structural(StructuralError::EmptySymbolSet))
        ));
    }

    #[test]
    fn test_duplicate_symbols_are_summed() {
        let tree = HuffmanTree::from_frequencies(vec![("a", 1), ("b", 2), ("a", 4)]).unwrap();
        assert_eq!(tree.leaf_count(), 2);
        // "b" (2) is now rarer than "a" (5), so it goes left.
        let table = tree.symbol_table().unwrap();
        assert_eq!(table, vec![("b".to_string(), bits("0")), ("a".to_string(), bits("1"))]);
    }

    #[test]
    fn test_code_table() {
        let table: HashMap<String, String> = sample_tree()
            .symbol_table()
            .unwrap()
            .into_iter()
            .map(|(symbol, code)| (symbol, code.to_string()))
            .collect();

        assert_eq!(table["stega"], "01");
        assert_eq!(table["alysi"], "000");
        assert_eq!(table["lysis"], "0010");
        assert_eq!(table["nalys"], "0011");
        assert_eq!(table["ganal"], "100");
        assert_eq!(table["egana"], "101");
        assert_eq!(table["analy"], "110");
        assert_eq!(table["tegan"], "111");
    }

    #[test]
    fn test_codes_follow_edges() {
        let tree = sample_tree();
        let mut stack = vec![(tree.root, BitString::new())];
        while let Some((id, expected)) = stack.pop() {
            assert_eq!(tree.nodes[id].path_code.as_ref(), Some(&expected));
            if let NodeKind::Internal { left, right } = tree.nodes[id].kind {
                stack.push((left, expected.concat(&bits("0"))));
                stack.push((right, expected.concat(&bits("1"))));
            }
        }
    }

    #[test]
    fn test_codes_prefix_free() {
        let codes = sample_tree().leaf_path_codes().unwrap();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a), "{a} is a prefix of {b}");
                }
            }
        }
    }

    #[test]
    fn test_encode_sample() {
        let encoding = sample_tree()
            .encode_bits_as_symbols(&bits("010011101"))
            .unwrap();
        assert_eq!(encoding.symbols, "steganalysegana");
        assert!(encoding.padding.is_empty());
    }

    #[test]
    fn test_encode_pads_with_zeros() {
        let tree = sample_tree();
        let input = bits("0100111011");
        let encoding = tree.encode_bits_as_symbols(&input).unwrap();
        assert_eq!(encoding.symbols, "steganalyseganaganal");
        assert_eq!(encoding.padding, bits("00"));

        let decoded = tree.decode_symbols_as_bits(&encoding.symbols, 5).unwrap();
        assert_eq!(decoded, input.concat(&encoding.padding));
    }

    #[test]
    fn test_round_trip_many_lengths() {
        let tree = sample_tree();
        let depth = tree.depth();
        for len in 1..40 {
            let input: BitString = (0..len).map(|i| (i * 7 + len) % 3 == 0).collect();
            let encoding = tree.encode_bits_as_symbols(&input).unwrap();
            assert!(encoding.padding.len() < depth);
            let decoded = tree.decode_symbols_as_bits(&encoding.symbols, 5).unwrap();
            assert_eq!(decoded, input.concat(&encoding.padding));
        }
    }

    #[test]
    fn test_decode_pads_final_chunk() {
        let tree = HuffmanTree::from_frequencies(vec![("ab", 3), ("c ", 1)]).unwrap();
        assert_eq!(tree.decode_symbols_as_bits("abc", 2).unwrap(), bits("10"));
    }

    #[test]
    fn test_decode_unknown_symbol() {
        let result = sample_tree().decode_symbols_as_bits("stegaxxxxx", 5);
        assert!(matches!(
            result,
            Err(crate::error::Error::Lookup(LookupError::UnknownSymbol(ref s))) if s == "xxxxx"
        ));
    }

    #[test]
    fn test_decode_requires_codes() {
        let tree = HuffmanTree::build(sample_symbols()).unwrap();
        assert!(tree.decode_symbols_as_bits("stega", 5).is_err());
        assert!(tree.decode_symbols_as_bits("stega", 0).is_err());
    }

    #[test]
    fn test_degenerate_tree() {
        let tree = HuffmanTree::from_frequencies(vec![("only", 4)]).unwrap();
        assert!(matches!(
            tree.encode_bits_as_symbols(&bits("0101")),
            Err(crate::error::Error::Structural(StructuralError::DegenerateTree))
        ));
    }

    #[test]
    fn test_symbol_length() {
        let tree = sample_tree();
        assert!(tree.has_symbol_length(5));
        assert!(!tree.has_symbol_length(4));
    }

    #[test]
    fn test_statistics() {
        let codes = sample_tree().leaf_path_codes().unwrap();
        assert_eq!(codes.len(), 8);
        assert!((average_code_length(&codes) - 3.125).abs() < 1e-12);
        assert!((expected_code_length(&codes) - 2.875).abs() < 1e-12);
        assert_eq!(average_code_length(&[]), 0.0);
    }

    #[test]
    fn test_serial_round_trip() {
        let tree = sample_tree();
        let serial = tree.to_serial();
        let json = serde_json::to_string(&serial).unwrap();
        let back: SerialNode = serde_json::from_str(&json).unwrap();
        let restored = HuffmanTree::from_serial(back).unwrap();

        assert_eq!(restored.to_serial(), serial);
        assert_eq!(restored.symbol_table().unwrap(), tree.symbol_table().unwrap());
        assert_eq!(
            restored.encode_bits_as_symbols(&bits("010011101")).unwrap().symbols,
            "steganalysegana"
        );
    }

    #[test]
    fn test_serial_without_codes_gets_allocated() {
        let serial = SerialNode {
            value: None,
            path_code: None,
            left: Some(Box::new(SerialNode {
                value: Some("a".into()),
                ..Default::default()
            })),
            right: Some(Box::new(SerialNode {
                value: Some("b".into()),
                ..Default::default()
            })),
        };
        let tree = HuffmanTree::from_serial(serial).unwrap();
        assert_eq!(tree.decode_symbols_as_bits("ba", 1).unwrap(), bits("10"));
    }

    #[test]
    fn test_serial_single_child_rejected() {
        let serial = SerialNode {
            value: None,
            path_code: Some(BitString::new()),
            left: Some(Box::new(SerialNode {
                value: Some("a".into()),
                path_code: Some(bits("0")),
                ..Default::default()
            })),
            right: None,
        };
        assert!(matches!(
            HuffmanTree::from_serial(serial),
            Err(crate::error::Error::Structural(StructuralError::SingleChild { .. }))
        ));
    }

    #[test]
    fn test_serial_wrong_code_rejected() {
        let mut serial = sample_tree().to_serial();
        if let Some(left) = serial.left.as_mut() {
            left.path_code = Some(bits("1"));
        }
        assert!(matches!(
            HuffmanTree::from_serial(serial),
            Err(crate::error::Error::Structural(StructuralError::WrongPathCode { .. }))
        ));
    }

    #[test]
    fn test_serial_missing_code_rejected() {
        let mut serial = sample_tree().to_serial();
        if let Some(right) = serial.right.as_mut() {
            right.path_code = None;
        }
        assert!(matches!(
            HuffmanTree::from_serial(serial),
            Err(crate::error::Error::Structural(StructuralError::MissingPathCode { .. }))
        ));
    }
}
