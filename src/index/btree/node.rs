//! B-Tree node and its page encoding.

use crate::common::config::{
    IndexConfig, CHILD_SLOT_SIZE, KEY_LEN_PREFIX, NODE_HEADER_SIZE, VALUE_SLOT_SIZE,
};
use crate::common::{Error, NodeId, Result};
use crate::storage::page::{Page, PageHeader, PageType};
use crate::value::ValueDescriptor;

/// Byte offsets of a node page for one order and key length.
///
/// # Layout
/// ```text
/// Offset            Size                    Field
/// ------            ----                    -----
/// 0                 5                       page header (type = Node)
/// 5                 4                       key_count
/// 9                 4                       parent (u32::MAX = none)
/// 13                4 × (M + 1)             children (u32::MAX = absent)
/// children_end      16 × M                  values (length u64, offset u64)
/// values_end        (2 + key_max_len) × M   keys (length u16, bytes)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    pub order: usize,
    pub key_max_len: usize,
}

impl NodeLayout {
    const OFFSET_KEY_COUNT: usize = PageHeader::SIZE;
    const OFFSET_PARENT: usize = PageHeader::SIZE + 4;

    pub fn new(order: usize, key_max_len: usize) -> Self {
        Self { order, key_max_len }
    }

    #[inline]
    fn child_offset(&self, i: usize) -> usize {
        NODE_HEADER_SIZE + i * CHILD_SLOT_SIZE
    }

    #[inline]
    fn value_offset(&self, i: usize) -> usize {
        self.child_offset(self.order + 1) + i * VALUE_SLOT_SIZE
    }

    #[inline]
    fn key_offset(&self, i: usize) -> usize {
        self.value_offset(self.order) + i * (KEY_LEN_PREFIX + self.key_max_len)
    }
}

impl From<&IndexConfig> for NodeLayout {
    fn from(config: &IndexConfig) -> Self {
        Self::new(config.order, config.key_max_len)
    }
}

/// A B-Tree node as held in memory.
///
/// `keys[i]` and `values[i]` belong together. `children[i]` holds the keys
/// between `keys[i - 1]` and `keys[i]`, so there is always one more child
/// slot than keys. A leaf has every child slot empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub keys: Vec<Vec<u8>>,
    pub values: Vec<ValueDescriptor>,
    pub children: Vec<Option<NodeId>>,
}

impl Node {
    /// An empty leaf with no id yet. The node store assigns the id when the
    /// node is created.
    pub fn detached(parent: Option<NodeId>) -> Self {
        Self {
            id: NodeId::new(u32::MAX),
            parent,
            keys: Vec::new(),
            values: Vec::new(),
            children: vec![None],
        }
    }

    #[inline]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// A node is a leaf when its first child slot is empty.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.first().map_or(true, Option::is_none)
    }

    /// Check that the node fits the slots `layout` reserves.
    ///
    /// # Errors
    /// `Error::CapacityExceeded` for more keys than the order allows or a key
    /// longer than `key_max_len`.
    pub fn check_fits(&self, layout: &NodeLayout) -> Result<()> {
        if self.keys.len() > layout.order {
            return Err(Error::CapacityExceeded {
                what: "node key count",
                len: self.keys.len() as u64,
                max: layout.order as u64,
            });
        }
        match self.keys.iter().find(|key| key.len() > layout.key_max_len) {
            Some(key) => Err(Error::CapacityExceeded {
                what: "key",
                len: key.len() as u64,
                max: layout.key_max_len as u64,
            }),
            None => Ok(()),
        }
    }

    /// Encode into `page`, replacing its contents and checksum.
    ///
    /// The page is left untouched when the node does not fit.
    ///
    /// # Errors
    /// `Error::CapacityExceeded` as for [`Node::check_fits`].
    pub fn encode(&self, page: &mut Page, layout: &NodeLayout) -> Result<()> {
        self.check_fits(layout)?;
        debug_assert_eq!(self.values.len(), self.keys.len());
        debug_assert_eq!(self.children.len(), self.keys.len() + 1);

        page.reset();
        page.set_header(&PageHeader::new(PageType::Node));
        page.write_u32(NodeLayout::OFFSET_KEY_COUNT, self.keys.len() as u32);
        page.write_u32(NodeLayout::OFFSET_PARENT, NodeId::to_raw(self.parent));

        for i in 0..=layout.order {
            let child = self.children.get(i).copied().flatten();
            page.write_u32(layout.child_offset(i), NodeId::to_raw(child));
        }

        for (i, value) in self.values.iter().enumerate() {
            let offset = layout.value_offset(i);
            page.write_u64(offset, value.length);
            page.write_u64(offset + 8, value.offset);
        }

        for (i, key) in self.keys.iter().enumerate() {
            let offset = layout.key_offset(i);
            page.write_u16(offset, key.len() as u16);
            let start = offset + KEY_LEN_PREFIX;
            page.as_mut_slice()[start..start + key.len()].copy_from_slice(key);
        }

        page.update_checksum();
        Ok(())
    }

    /// Decode the node stored in `page`.
    ///
    /// # Errors
    /// - `Error::NodeNotFound` if the page was allocated but never written
    /// - `Error::Corrupted` on a checksum failure or impossible field values
    pub fn decode(id: NodeId, page: &Page, layout: &NodeLayout) -> Result<Self> {
        let corrupted = |reason: String| Error::Corrupted {
            page: id.0,
            reason,
        };

        match page.page_type() {
            PageType::Node => {}
            PageType::Invalid => return Err(Error::NodeNotFound(id)),
            other => return Err(corrupted(format!("expected a node page, found {:?}", other))),
        }
        if !page.verify_checksum() {
            return Err(corrupted("checksum mismatch".to_string()));
        }

        let key_count = page.read_u32(NodeLayout::OFFSET_KEY_COUNT) as usize;
        if key_count > layout.order {
            return Err(corrupted(format!(
                "key count {} exceeds order {}",
                key_count, layout.order
            )));
        }
        let parent = NodeId::from_raw(page.read_u32(NodeLayout::OFFSET_PARENT));

        let children = (0..=key_count)
            .map(|i| NodeId::from_raw(page.read_u32(layout.child_offset(i))))
            .collect();

        let values = (0..key_count)
            .map(|i| {
                let offset = layout.value_offset(i);
                ValueDescriptor::new(page.read_u64(offset), page.read_u64(offset + 8))
            })
            .collect();

        let mut keys = Vec::with_capacity(key_count);
        for i in 0..key_count {
            let offset = layout.key_offset(i);
            let len = page.read_u16(offset) as usize;
            if len > layout.key_max_len {
                return Err(corrupted(format!(
                    "key {} has length {} above maximum {}",
                    i, len, layout.key_max_len
                )));
            }
            let start = offset + KEY_LEN_PREFIX;
            keys.push(page.as_slice()[start..start + len].to_vec());
        }

        Ok(Self {
            id,
            parent,
            keys,
            values,
            children,
        })
    }
}
