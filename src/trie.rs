//! Depth-bounded byte trie.
//!
//! Every path from the root spells a prefix of some inserted sequence,
//! truncated to `max_depth` symbols. Children live in a sparse map so a
//! node costs O(edges) rather than O(alphabet).
//!
//! The trie is write-once-then-read: nothing in the forward pass creates
//! nodes.

use std::collections::BTreeMap;

use crate::errors::{EsnError, Result};

// ---------------------------------------------------------------------------
// TrieNode
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrieNode {
    /// Distance from the root (root = 0)
    pub depth: usize,
    /// True if some inserted sequence ends exactly here
    pub is_leaf: bool,
    children: BTreeMap<u8, TrieNode>,
}

impl TrieNode {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            is_leaf: false,
            children: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn child(&self, symbol: u8) -> Option<&TrieNode> {
        self.children.get(&symbol)
    }

    pub fn children(&self) -> impl Iterator<Item = (u8, &TrieNode)> {
        self.children.iter().map(|(&s, n)| (s, n))
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    fn count(&self) -> usize {
        1 + self.children.values().map(TrieNode::count).sum::<usize>()
    }

    fn height(&self) -> usize {
        self.children
            .values()
            .map(TrieNode::height)
            .max()
            .unwrap_or(self.depth)
    }
}

// ---------------------------------------------------------------------------
// Trie
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Trie {
    root: TrieNode,
    max_depth: usize,
    alphabet_size: usize,
}

impl Trie {
    pub fn new(max_depth: usize, alphabet_size: usize) -> Result<Self> {
        if max_depth == 0 {
            return Err(EsnError::config("trie max_depth must be > 0"));
        }
        if alphabet_size == 0 || alphabet_size > crate::config::MAX_ALPHABET {
            return Err(EsnError::config(format!(
                "trie alphabet_size must be in 1..=256, got {alphabet_size}"
            )));
        }
        Ok(Self {
            root: TrieNode::new(0),
            max_depth,
            alphabet_size,
        })
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    #[inline]
    pub fn check_symbol(&self, symbol: u8) -> Result<()> {
        if (symbol as usize) < self.alphabet_size {
            Ok(())
        } else {
            Err(EsnError::OutOfRangeSymbol {
                symbol,
                alphabet_size: self.alphabet_size,
            })
        }
    }

    /// Insert a sequence, silently truncated to `max_depth` symbols.
    ///
    /// The whole kept prefix is validated against the alphabet before any
    /// node is created, so a rejected insert leaves the trie untouched.
    pub fn insert(&mut self, sequence: &[u8]) -> Result<()> {
        let kept = &sequence[..sequence.len().min(self.max_depth)];
        for &symbol in kept {
            self.check_symbol(symbol)?;
        }

        let mut cur = &mut self.root;
        for &symbol in kept {
            let depth = cur.depth + 1;
            cur = cur.children.entry(symbol).or_insert_with(|| TrieNode::new(depth));
        }
        cur.is_leaf = true;
        Ok(())
    }

    /// Node reached by the first `max_depth` symbols of `prefix`, if present.
    pub fn lookup(&self, prefix: &[u8]) -> Option<&TrieNode> {
        prefix
            .iter()
            .take(self.max_depth)
            .try_fold(&self.root, |node, &symbol| node.child(symbol))
    }

    /// True if `sequence` (truncated to `max_depth`) was inserted.
    pub fn contains(&self, sequence: &[u8]) -> bool {
        self.lookup(sequence).map(|n| n.is_leaf).unwrap_or(false)
    }

    /// Total nodes including the root.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    /// Deepest populated depth (0 for an empty trie).
    pub fn height(&self) -> usize {
        self.root.height()
    }
}

/// Build a trie from a vocabulary of byte strings.
pub fn build_trie<S: AsRef<[u8]>>(
    vocabulary: &[S],
    max_depth: usize,
    alphabet_size: usize,
) -> Result<Trie> {
    let mut trie = Trie::new(max_depth, alphabet_size)?;
    for word in vocabulary {
        trie.insert(word.as_ref())?;
    }
    Ok(trie)
}
