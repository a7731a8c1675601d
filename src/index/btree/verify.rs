//! Structural integrity check.

use crate::common::config::DuplicatePolicy;
use crate::common::{Error, NodeId, Result};

use super::node::Node;
use super::tree::BTree;

/// Summary of a tree that passed [`BTree::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeReport {
    /// Levels from the root down to the leaves. A lone root has height 1.
    pub height: usize,
    /// Nodes reachable from the root.
    pub nodes: u64,
    /// Keys stored in the tree.
    pub keys: u64,
    pub generation: u64,
}

/// State carried through the in-order walk.
struct Walk<'a> {
    tree: &'a BTree,
    allow_equal: bool,
    leaf_depth: Option<usize>,
    last_key: Option<Vec<u8>>,
    nodes: u64,
    keys: u64,
}

impl Walk<'_> {
    fn visit(&mut self, id: NodeId, parent: Option<NodeId>, depth: usize) -> Result<()> {
        let node = self.tree.store.load(id)?;
        let fail = |reason: String| Error::Corrupted { page: id.0, reason };

        if node.parent != parent {
            return Err(fail(format!(
                "parent is {:?}, expected {:?}",
                node.parent, parent
            )));
        }

        let order = self.tree.config.order;
        let min_keys = if parent.is_none() { 0 } else { 1 };
        if node.key_count() < min_keys || node.key_count() >= order {
            return Err(fail(format!(
                "holds {} keys, allowed {}..={}",
                node.key_count(),
                min_keys,
                order - 1
            )));
        }

        let present = node.children.iter().filter(|c| c.is_some()).count();
        if present != 0 && present != node.children.len() {
            return Err(fail("mixes present and absent children".to_string()));
        }

        for pair in node.keys.windows(2) {
            let ordered = if self.allow_equal {
                pair[0] <= pair[1]
            } else {
                pair[0] < pair[1]
            };
            if !ordered {
                return Err(fail("keys out of order".to_string()));
            }
        }

        self.nodes += 1;
        self.keys += node.key_count() as u64;

        if node.is_leaf() {
            match self.leaf_depth {
                None => self.leaf_depth = Some(depth),
                Some(d) if d != depth => {
                    return Err(fail(format!("leaf at depth {}, expected {}", depth, d)));
                }
                Some(_) => {}
            }
            for key in &node.keys {
                self.see_key(&node, key)?;
            }
            return Ok(());
        }

        for (i, child) in node.children.iter().enumerate() {
            if let Some(child) = child {
                self.visit(*child, Some(id), depth + 1)?;
            }
            if let Some(key) = node.keys.get(i) {
                self.see_key(&node, key)?;
            }
        }
        Ok(())
    }

    /// Check `key` against the previous key of the in-order sequence.
    fn see_key(&mut self, node: &Node, key: &[u8]) -> Result<()> {
        if let Some(last) = &self.last_key {
            let ordered = if self.allow_equal {
                last.as_slice() <= key
            } else {
                last.as_slice() < key
            };
            if !ordered {
                return Err(Error::Corrupted {
                    page: node.id.0,
                    reason: "in-order traversal is not ascending".to_string(),
                });
            }
        }
        self.last_key = Some(key.to_vec());
        Ok(())
    }
}

impl BTree {
    /// Walk the whole tree and check its structure.
    ///
    /// Checked: parent links match the child lists, every non-root node
    /// holds between 1 and `order - 1` keys, leaves sit at one depth, a node
    /// has all children or none, keys ascend in order (non-strictly under
    /// `DuplicatePolicy::Append`) and the reachable node count matches the
    /// head generation.
    ///
    /// # Errors
    /// `Error::Corrupted` describing the first violation found, or node
    /// store errors.
    pub fn verify(&self) -> Result<TreeReport> {
        let head = self.meta.head;
        let mut walk = Walk {
            tree: self,
            allow_equal: self.config.duplicate_policy == DuplicatePolicy::Append,
            leaf_depth: None,
            last_key: None,
            nodes: 0,
            keys: 0,
        };
        walk.visit(head.root, None, 1)?;

        if walk.nodes != head.generation {
            return Err(Error::Corrupted {
                page: head.root.0,
                reason: format!(
                    "{} nodes reachable, head generation is {}",
                    walk.nodes, head.generation
                ),
            });
        }

        Ok(TreeReport {
            height: walk.leaf_depth.unwrap_or(1),
            nodes: walk.nodes,
            keys: walk.keys,
            generation: head.generation,
        })
    }
}
