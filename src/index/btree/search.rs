//! Search within a node and down the tree.

use crate::common::Result;
use crate::value::ValueDescriptor;

use super::node::Node;
use super::tree::BTree;

/// Where a search for a key ended.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The node the search stopped in.
    pub node: Node,
    /// Slot of the key when found, otherwise the slot it would be inserted
    /// at in `node` (always a leaf).
    pub index: usize,
    pub found: bool,
}

impl SearchResult {
    /// Descriptor stored with the key, if it was found.
    pub fn value(&self) -> Option<ValueDescriptor> {
        if self.found {
            self.node.values.get(self.index).copied()
        } else {
            None
        }
    }
}

/// Index of the first key in `node` greater than `key`, or the key count if
/// there is none.
///
/// This is both the insertion slot for `key` and the child to descend into.
/// An equal key can only sit at the slot just before it.
pub fn search_node(node: &Node, key: &[u8]) -> usize {
    node.keys
        .iter()
        .position(|k| key < k.as_slice())
        .unwrap_or(node.keys.len())
}

impl BTree {
    /// Walk from the root to the node holding `key`, or to the leaf where it
    /// would be inserted.
    pub fn search(&self, key: &[u8]) -> Result<SearchResult> {
        let mut node = self.store.load(self.meta.head.root)?;
        loop {
            let i = search_node(&node, key);
            if i > 0 && node.keys[i - 1] == key {
                return Ok(SearchResult {
                    node,
                    index: i - 1,
                    found: true,
                });
            }
            let next = node.children[i];
            match next {
                Some(child) => node = self.store.load(child)?,
                None => {
                    return Ok(SearchResult {
                        node,
                        index: i,
                        found: false,
                    })
                }
            }
        }
    }

    /// Walk to the leaf where `key` goes after every key equal to it.
    ///
    /// Equal keys on the way down are passed over, not returned.
    pub fn search_leaf(&self, key: &[u8]) -> Result<(Node, usize)> {
        let mut node = self.store.load(self.meta.head.root)?;
        loop {
            let i = search_node(&node, key);
            let next = node.children[i];
            match next {
                Some(child) => node = self.store.load(child)?,
                None => return Ok((node, i)),
            }
        }
    }
}
