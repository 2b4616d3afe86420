use crate::bits::{Bit, BitReader, BitWriter};
use crate::error::Result;
use crate::huffman::counts::FrequencyCounter;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{Read, Write};

/// Placeholder child index used while a deserialized node is incomplete.
/// Every hole is filled before `deserialize` returns.
const HOLE: usize = usize::MAX;

#[derive(Clone, Debug)]
enum Node {
    Leaf { weight: u64, symbol: u8 },
    Internal { weight: u64, left: usize, right: usize },
}

impl Node {
    fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }
}

/// Huffman tree over byte symbols.
///
/// Nodes live in an arena and refer to each other by index; the decode
/// cursor is a non-owning index into the same arena. An empty tree (built
/// from an empty source) has no root.
///
/// The wire form is a pre-order traversal with the right subtree written
/// before the left: an internal node is the bit `0`, a leaf is the bit `1`
/// followed by 8 symbol bits. Whatever shape the encoder serialized is the
/// shape the decoder rebuilds, so tie-breaking between equal weights never
/// has to match across runs.
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: Option<usize>,
    cursor: Option<usize>,
}

impl HuffmanTree {
    /// Build a tree from an occurrence table.
    ///
    /// Classic bottom-up construction: every symbol becomes a leaf weighted
    /// by its count, then the two lightest subtrees merge (first popped on
    /// the left) until one root remains. O(n log n) over distinct symbols.
    pub fn from_counts(counts: &FrequencyCounter) -> Self {
        let mut nodes = Vec::with_capacity(counts.distinct() * 2);
        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();

        for (symbol, count) in counts.iter() {
            let idx = nodes.len();
            nodes.push(Node::Leaf { weight: count, symbol });
            heap.push(Reverse((count, idx)));
        }

        while heap.len() > 1 {
            let Reverse((lw, left)) = heap.pop().expect("heap holds at least two entries");
            let Reverse((rw, right)) = heap.pop().expect("heap holds at least two entries");
            let idx = nodes.len();
            nodes.push(Node::Internal { weight: lw + rw, left, right });
            heap.push(Reverse((lw + rw, idx)));
        }

        let root = heap.pop().map(|Reverse((_, idx))| idx);
        Self { nodes, root, cursor: root }
    }

    /// Whether the tree has no nodes (the source was empty).
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Whether the root itself is a leaf (single distinct symbol).
    pub fn root_is_leaf(&self) -> bool {
        matches!(self.root.map(|r| &self.nodes[r]), Some(Node::Leaf { .. }))
    }

    /// Write the tree to a bit stream. An empty tree writes nothing.
    pub fn serialize<W: Write>(&self, out: &mut BitWriter<W>) -> Result<()> {
        let Some(root) = self.root else { return Ok(()) };

        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            match self.nodes[idx] {
                Node::Internal { left, right, .. } => {
                    out.put_bit(Bit::Zero)?;
                    stack.push(left);
                    stack.push(right);
                }
                Node::Leaf { symbol, .. } => {
                    out.put_bit(Bit::One)?;
                    out.put_bits(symbol as u64, 8)?;
                }
            }
        }
        Ok(())
    }

    /// Read a tree back from a bit stream.
    ///
    /// Mirrors `serialize`: a frontier of unfilled child slots is kept on a
    /// stack, and each parsed node fills the most recently opened slot.
    /// An empty frontier means the tree is complete. Callers must know
    /// from the surrounding header that a tree is present at all.
    pub fn deserialize<R: Read>(input: &mut BitReader<R>) -> Result<Self> {
        enum Slot {
            Left(usize),
            Right(usize),
        }

        fn read_node<R: Read>(
            input: &mut BitReader<R>,
            nodes: &mut Vec<Node>,
            holes: &mut Vec<Slot>,
        ) -> Result<usize> {
            let idx = nodes.len();
            if input.read_bit()?.is_set() {
                let symbol = input.read_bits(8)? as u8;
                nodes.push(Node::Leaf { weight: 0, symbol });
            } else {
                nodes.push(Node::Internal { weight: 0, left: HOLE, right: HOLE });
                holes.push(Slot::Left(idx));
                holes.push(Slot::Right(idx));
            }
            Ok(idx)
        }

        let mut nodes = Vec::new();
        let mut holes = Vec::new();

        let root = read_node(input, &mut nodes, &mut holes)?;
        while let Some(slot) = holes.pop() {
            let child = read_node(input, &mut nodes, &mut holes)?;
            match slot {
                Slot::Left(parent) => {
                    if let Node::Internal { left, .. } = &mut nodes[parent] {
                        *left = child;
                    }
                }
                Slot::Right(parent) => {
                    if let Node::Internal { right, .. } = &mut nodes[parent] {
                        *right = child;
                    }
                }
            }
        }

        Ok(Self { nodes, root: Some(root), cursor: Some(root) })
    }

    /// Extract the code for every symbol: `0` appended on a left descent,
    /// `1` on a right descent. A root that is itself a leaf gets the
    /// single-bit code `1`.
    pub fn codebook(&self) -> Codebook {
        let mut codebook = Codebook::new();
        let Some(root) = self.root else { return codebook };

        if let Node::Leaf { symbol, .. } = self.nodes[root] {
            codebook.insert(symbol, vec![Bit::One]);
            return codebook;
        }

        let mut stack: Vec<(usize, Vec<Bit>)> = vec![(root, Vec::new())];
        while let Some((idx, path)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { symbol, .. } => codebook.insert(*symbol, path),
                Node::Internal { left, right, .. } => {
                    let mut left_path = path.clone();
                    left_path.push(Bit::Zero);
                    stack.push((*left, left_path));

                    let mut right_path = path;
                    right_path.push(Bit::One);
                    stack.push((*right, right_path));
                }
            }
        }
        codebook
    }

    /// Mean codeword length weighted by symbol frequency, where `total`
    /// is the sum of all leaf weights. A single-symbol tree codes in one
    /// bit; an empty tree in zero.
    pub fn mean_code_length(&self, total: u64) -> f64 {
        let Some(root) = self.root else { return 0.0 };
        if total == 0 {
            return 0.0;
        }
        if matches!(self.nodes[root], Node::Leaf { .. }) {
            return 1.0;
        }

        let mut mean = 0.0;
        let mut stack: Vec<(usize, u32)> = vec![(root, 0)];
        while let Some((idx, depth)) = stack.pop() {
            match self.nodes[idx] {
                Node::Leaf { weight, .. } => {
                    mean += weight as f64 / total as f64 * depth as f64;
                }
                Node::Internal { left, right, .. } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
            }
        }
        mean
    }

    /// Advance the decode cursor by one bit: `0` descends left, `1` right.
    /// Calling this with the cursor on a leaf is a bug in the caller; the
    /// cursor stays put.
    pub fn walk(&mut self, bit: Bit) {
        let Some(cursor) = self.cursor else { return };
        if let Node::Internal { left, right, .. } = self.nodes[cursor] {
            self.cursor = Some(if bit.is_set() { right } else { left });
        } else {
            debug_assert!(false, "walked past a leaf");
        }
    }

    /// Whether the decode cursor sits on a leaf.
    pub fn at_leaf(&self) -> bool {
        matches!(self.cursor.map(|c| &self.nodes[c]), Some(Node::Leaf { .. }))
    }

    /// Symbol under the decode cursor, if it sits on a leaf.
    pub fn leaf_symbol(&self) -> Option<u8> {
        match self.cursor.map(|c| &self.nodes[c]) {
            Some(Node::Leaf { symbol, .. }) => Some(*symbol),
            _ => None,
        }
    }

    /// Return the decode cursor to the root.
    pub fn reset_walk(&mut self) {
        self.cursor = self.root;
    }

    /// Total weight at the root (sum of all counts in the source).
    pub fn total_weight(&self) -> u64 {
        self.root.map(|r| self.nodes[r].weight()).unwrap_or(0)
    }
}

/// Map from byte symbol to its Huffman code.
pub struct Codebook {
    codes: Vec<Option<Vec<Bit>>>,
}

impl Codebook {
    fn new() -> Self {
        Self { codes: vec![None; 256] }
    }

    fn insert(&mut self, symbol: u8, code: Vec<Bit>) {
        self.codes[symbol as usize] = Some(code);
    }

    /// Code for a symbol, if the symbol occurred in the source.
    pub fn get(&self, symbol: u8) -> Option<&[Bit]> {
        self.codes[symbol as usize].as_deref()
    }

    /// Number of symbols with a code.
    pub fn len(&self) -> usize {
        self.codes.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.iter().all(|c| c.is_none())
    }
}
