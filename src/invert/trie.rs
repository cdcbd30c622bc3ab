use std::collections::BTreeMap;
use std::mem;

use super::term_block::TermBlock;
use crate::schema::TermKind;

/// Estimated per-node overhead charged against the memory budget; the trie
/// itself has no `Vec<u8>` payload of its own, but each `BTreeMap` entry and
/// `TrieNode` still costs real bytes, and spec.md §4.2 asks the buffer to
/// track "aggregate bytes live in all TermBlocks plus the trie itself".
const NODE_OVERHEAD_ESTIMATE: usize = mem::size_of::<TrieNode>() + 16;

#[derive(Default)]
struct TrieNode {
    children: BTreeMap<u8, TrieNode>,
    block: Option<TermBlock>,
    /// Set by `stop_terms_preload`: this path spells a known stop term,
    /// even before any posting has been added for it.
    known_stop: bool,
}

/// A byte-wise trie keyed by term bytes; terminal nodes own a `TermBlock`
/// (spec.md §4.2). Traversal in trie order is the sorted term order the
/// run writer relies on.
pub struct Trie {
    root: TrieNode,
}

impl Trie {
    pub fn new() -> Trie {
        Trie {
            root: TrieNode::default(),
        }
    }

    /// Marks `term` as a recognized stop term, ahead of any `add_term`
    /// call, per spec.md §4.2's `stop_terms_preload`.
    pub fn preload_stop_term(&mut self, term: &[u8]) -> usize {
        let mut node = &mut self.root;
        let mut new_nodes = 0;
        for &byte in term {
            if !node.children.contains_key(&byte) {
                new_nodes += 1;
            }
            node = node.children.entry(byte).or_default();
        }
        node.known_stop = true;
        if let Some(ref mut block) = node.block {
            block.term_kind = TermKind::Stop;
        }
        new_nodes
    }

    /// Returns the `TermBlock` for `term`, creating it (and any missing
    /// trie nodes along the way) if this is the first time the term has
    /// been seen. `include_in_counts` only takes effect on first creation.
    ///
    /// Returns `(block, is_new_term, bytes_added_to_trie)`.
    pub fn get_or_create_block(
        &mut self,
        term: &[u8],
        include_in_counts: bool,
    ) -> (&mut TermBlock, bool, usize) {
        let mut node = &mut self.root;
        let mut new_nodes = 0usize;
        for &byte in term {
            if !node.children.contains_key(&byte) {
                new_nodes += 1;
            }
            node = node.children.entry(byte).or_default();
        }
        let mut bytes_added = new_nodes * NODE_OVERHEAD_ESTIMATE;
        let is_new_term = node.block.is_none();
        if is_new_term {
            node.block = Some(TermBlock::new(include_in_counts));
            if node.known_stop {
                node.block.as_mut().unwrap().term_kind = TermKind::Stop;
            }
            bytes_added += NODE_OVERHEAD_ESTIMATE;
        }
        (node.block.as_mut().unwrap(), is_new_term, bytes_added)
    }

    /// True iff `term`'s path was preloaded as a stop term.
    pub fn is_known_stop(&self, term: &[u8]) -> bool {
        let mut node = &self.root;
        for &byte in term {
            match node.children.get(&byte) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.known_stop
    }

    /// Iterates `(term_bytes, &TermBlock)` pairs in byte-wise sorted order
    /// for every terminal node that has accumulated at least one posting
    /// attempt (a block was created).
    pub fn iter_sorted(&self) -> impl Iterator<Item = (Vec<u8>, &TermBlock)> {
        let mut out = Vec::new();
        collect(&self.root, &mut Vec::new(), &mut out);
        out.into_iter()
    }

    pub fn clear(&mut self) {
        self.root = TrieNode::default();
    }
}

fn collect<'a>(node: &'a TrieNode, prefix: &mut Vec<u8>, out: &mut Vec<(Vec<u8>, &'a TermBlock)>) {
    if let Some(ref block) = node.block {
        out.push((prefix.clone(), block));
    }
    for (&byte, child) in &node.children {
        prefix.push(byte);
        collect(child, prefix, out);
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_traversal() {
        let mut trie = Trie::new();
        for term in ["dog", "cat", "mat", "sat"] {
            let (block, _, _) = trie.get_or_create_block(term.as_bytes(), true);
            block.add_posting(1, 0, 1).unwrap();
        }
        let terms: Vec<String> = trie
            .iter_sorted()
            .map(|(bytes, _)| String::from_utf8(bytes).unwrap())
            .collect();
        assert_eq!(terms, vec!["cat", "dog", "mat", "sat"]);
    }

    #[test]
    fn test_stop_preload_marks_kind() {
        let mut trie = Trie::new();
        trie.preload_stop_term(b"the");
        assert!(trie.is_known_stop(b"the"));
        let (block, is_new, _) = trie.get_or_create_block(b"the", true);
        assert!(is_new);
        assert_eq!(block.term_kind, crate::schema::TermKind::Stop);
    }

    #[test]
    fn test_get_or_create_is_idempotent_identity() {
        let mut trie = Trie::new();
        let (_, is_new, _) = trie.get_or_create_block(b"abc", true);
        assert!(is_new);
        let (_, is_new_again, _) = trie.get_or_create_block(b"abc", true);
        assert!(!is_new_again);
    }
}
