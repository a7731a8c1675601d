//! Node Store - durable node records addressed by [`NodeId`].

use crate::buffer::{BufferPoolManager, PageReadGuard, PageWriteGuard};
use crate::common::{Error, NodeId, PageId, Result};

use super::node::{Node, NodeLayout};

/// Creates, loads and overwrites nodes in the node file.
///
/// Every node occupies one page. Writes go through the node cache and are
/// committed to disk (with fsync) before returning, so a `load` after a
/// `store` always sees the stored node, including after a reopen.
pub struct NodeStore {
    pool: BufferPoolManager,
    layout: NodeLayout,
}

impl NodeStore {
    pub fn new(pool: BufferPoolManager, layout: NodeLayout) -> Self {
        Self { pool, layout }
    }

    /// Reserve a fresh id without writing a node.
    ///
    /// The node file grows by one page, so the id is never handed out again.
    /// Loading the id before a `store` fails with `Error::NodeNotFound`.
    pub fn allocate_id(&self) -> Result<NodeId> {
        let id = NodeId::from(self.pool.allocate_page_id()?);
        tracing::debug!(node = id.0, "allocated node id");
        Ok(id)
    }

    /// Allocate an id for `node`, assign it and persist the node.
    ///
    /// A node that does not fit the layout is refused before an id is
    /// allocated.
    pub fn create(&self, node: &mut Node) -> Result<NodeId> {
        node.check_fits(&self.layout)?;
        let mut guard = self.pool.new_page()?;
        node.id = NodeId::from(guard.page_id());
        node.encode(&mut guard, &self.layout)?;
        guard.commit()?;

        tracing::debug!(node = node.id.0, "created node");
        Ok(node.id)
    }

    /// Read the current contents of a node.
    ///
    /// # Errors
    /// - `Error::NodeNotFound` for an id that was never allocated, or
    ///   allocated but never written
    /// - `Error::Corrupted` if the page fails its checksum
    pub fn load(&self, id: NodeId) -> Result<Node> {
        let guard = self.fetch_read(id)?;
        Node::decode(id, &guard, &self.layout)
    }

    /// Overwrite an existing node.
    ///
    /// On error the stored node is unchanged, in the cache and on disk.
    pub fn store(&self, node: &Node) -> Result<()> {
        node.check_fits(&self.layout)?;
        let mut guard = self.fetch_write(node.id)?;
        node.encode(&mut guard, &self.layout)?;
        guard.commit()
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// The node cache, shared with the meta page.
    pub fn pool(&self) -> &BufferPoolManager {
        &self.pool
    }

    fn fetch_read(&self, id: NodeId) -> Result<PageReadGuard<'_>> {
        if id.page_id() == PageId::META {
            return Err(Error::NodeNotFound(id));
        }
        self.pool
            .fetch_page_read(id.page_id())
            .map_err(|e| not_found(id, e))
    }

    fn fetch_write(&self, id: NodeId) -> Result<PageWriteGuard<'_>> {
        if id.page_id() == PageId::META {
            return Err(Error::NodeNotFound(id));
        }
        self.pool
            .fetch_page_write(id.page_id())
            .map_err(|e| not_found(id, e))
    }
}

fn not_found(id: NodeId, err: Error) -> Error {
    match err {
        Error::PageNotFound(_) => Error::NodeNotFound(id),
        other => other,
    }
}
