//! Node identifier type.

use std::fmt;

use super::PageId;

/// Identifies a B-Tree node.
///
/// A node lives in exactly one page of the node file, so its id is that page
/// number. Ids are handed out by the node store and never reused. Absent
/// links are `Option<NodeId>` in memory and `PageId::INVALID` on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// The page holding this node.
    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId(self.0)
    }

    /// Decode an on-disk link, mapping the sentinel to `None`.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        if raw == PageId::INVALID.0 {
            None
        } else {
            Some(NodeId(raw))
        }
    }

    /// Encode an optional link for disk.
    #[inline]
    pub fn to_raw(link: Option<NodeId>) -> u32 {
        link.map_or(PageId::INVALID.0, |id| id.0)
    }
}

impl From<PageId> for NodeId {
    fn from(page_id: PageId) -> Self {
        NodeId(page_id.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_link_roundtrip_sentinel() {
        assert_eq!(NodeId::from_raw(u32::MAX), None);
        assert_eq!(NodeId::to_raw(None), u32::MAX);
        assert_eq!(NodeId::from_raw(NodeId::to_raw(Some(NodeId(9)))), Some(NodeId(9)));
    }

    #[test]
    fn test_node_id_page() {
        assert_eq!(NodeId::new(5).page_id(), PageId::new(5));
        assert_eq!(NodeId::from(PageId::new(5)), NodeId::new(5));
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(format!("{}", NodeId::new(12)), "Node(12)");
    }
}
