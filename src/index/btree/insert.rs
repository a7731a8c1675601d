//! Insert Engine - slot insertion, node splits and root promotion.

use crate::common::config::DuplicatePolicy;
use crate::common::{Error, NodeId, Result};
use crate::value::ValueDescriptor;

use super::node::Node;
use super::search::search_node;
use super::tree::BTree;

/// What an insert did with the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was added to the tree.
    Inserted,
    /// The key existed and its descriptor was replaced.
    Replaced,
}

/// Put `key` and `value` at `index` in `node`, with `child` as the subtree
/// right of the new key.
///
/// Keys and values from `index` on, and children from `index + 1` on, move
/// one slot right. `child` is `None` in a leaf and the new sibling when a
/// split is promoted into a parent.
pub fn insert_at(
    node: &mut Node,
    index: usize,
    child: Option<NodeId>,
    key: Vec<u8>,
    value: ValueDescriptor,
) {
    node.keys.insert(index, key);
    node.values.insert(index, value);
    node.children.insert(index + 1, child);
}

/// Split an overflowing node at the 1-based slot `split`.
///
/// `node` keeps the keys before the split slot and the children left of it.
/// Returns the key and value at the split slot, and a detached sibling
/// holding everything to the right. The sibling shares `node`'s parent.
pub fn split_node(node: &mut Node, split: usize) -> (Vec<u8>, ValueDescriptor, Node) {
    debug_assert!(split >= 1 && split < node.keys.len());

    let keys = node.keys.split_off(split);
    let values = node.values.split_off(split);
    let children = node.children.split_off(split);

    let mut sibling = Node::detached(node.parent);
    sibling.keys = keys;
    sibling.values = values;
    sibling.children = children;

    // `split` ≥ 1, so both pops see a key.
    let key = node.keys.pop().unwrap_or_default();
    let value = node.values.pop().unwrap_or_default();
    (key, value, sibling)
}

/// Slot in `parent` for a key promoted out of its child `child`.
///
/// With distinct keys this is `search_node(parent, key)`. Under
/// `DuplicatePolicy::Append` an equal key may already sit in the parent, so
/// the slot is taken from the child's position instead, which keeps the
/// sibling directly right of the node it was split from.
fn promotion_slot(parent: &Node, child: NodeId, key: &[u8]) -> Result<usize> {
    match parent.children.iter().position(|c| *c == Some(child)) {
        Some(index) => {
            debug_assert!(index <= search_node(parent, key));
            Ok(index)
        }
        None => Err(Error::Corrupted {
            page: parent.id.0,
            reason: format!("{} does not list child {}", parent.id, child),
        }),
    }
}

impl BTree {
    /// Insert `key` with the descriptor `value`.
    ///
    /// An existing key is handled by the configured
    /// [`DuplicatePolicy`]. Splits run bottom-up until every node on the
    /// path holds fewer than `order` keys.
    ///
    /// # Errors
    /// - `Error::CapacityExceeded` for an oversized key or value
    /// - `Error::DuplicateKey` for an existing key under `Reject`
    /// - node store errors; a failure partway through a split can leave the
    ///   tree inconsistent
    pub fn insert(&mut self, key: &[u8], value: ValueDescriptor) -> Result<InsertOutcome> {
        if key.len() > self.config.key_max_len {
            return Err(Error::CapacityExceeded {
                what: "key",
                len: key.len() as u64,
                max: self.config.key_max_len as u64,
            });
        }
        if value.length > self.config.max_value_len {
            return Err(Error::CapacityExceeded {
                what: "value",
                len: value.length,
                max: self.config.max_value_len,
            });
        }

        let (mut leaf, index) = match self.config.duplicate_policy {
            DuplicatePolicy::Append => self.search_leaf(key)?,
            policy => {
                let mut result = self.search(key)?;
                if result.found {
                    if policy == DuplicatePolicy::Reject {
                        return Err(Error::DuplicateKey);
                    }
                    result.node.values[result.index] = value;
                    self.store.store(&result.node)?;
                    return Ok(InsertOutcome::Replaced);
                }
                (result.node, result.index)
            }
        };

        insert_at(&mut leaf, index, None, key.to_vec(), value);
        self.settle(leaf)?;
        Ok(InsertOutcome::Inserted)
    }

    /// Store `node`, splitting it and promoting into its ancestors while a
    /// node on the way up is full.
    fn settle(&mut self, mut node: Node) -> Result<()> {
        let order = self.config.order;
        let split = self.config.split_slot();
        let mut head = self.meta.head;

        while node.key_count() >= order {
            let (key, value, mut sibling) = split_node(&mut node, split);

            // A new root is allocated up front so that both halves are
            // written once, already pointing at it.
            let new_root = if node.parent.is_none() {
                let id = self.store.allocate_id()?;
                node.parent = Some(id);
                sibling.parent = Some(id);
                Some(id)
            } else {
                None
            };

            self.store.create(&mut sibling)?;
            for child in sibling.children.iter().flatten() {
                let mut moved = self.store.load(*child)?;
                moved.parent = Some(sibling.id);
                self.store.store(&moved)?;
            }
            self.store.store(&node)?;
            head.generation += 1;

            tracing::debug!(
                node = node.id.0,
                sibling = sibling.id.0,
                kept = node.key_count(),
                moved = sibling.key_count(),
                "split node"
            );

            match new_root {
                Some(root_id) => {
                    let root = Node {
                        id: root_id,
                        parent: None,
                        keys: vec![key],
                        values: vec![value],
                        children: vec![Some(node.id), Some(sibling.id)],
                    };
                    self.store.store(&root)?;
                    head.root = root_id;
                    head.generation += 1;

                    tracing::debug!(
                        root = root_id.0,
                        generation = head.generation,
                        "promoted new root"
                    );
                    return self.write_head(head);
                }
                None => {
                    let parent_id = node.parent.ok_or_else(|| Error::Corrupted {
                        page: node.id.0,
                        reason: "split node lost its parent".to_string(),
                    })?;
                    let mut parent = self.store.load(parent_id)?;
                    let index = promotion_slot(&parent, node.id, &key)?;
                    insert_at(&mut parent, index, Some(sibling.id), key, value);
                    node = parent;
                }
            }
        }

        self.store.store(&node)?;
        if head != self.meta.head {
            self.write_head(head)?;
        }
        Ok(())
    }
}
