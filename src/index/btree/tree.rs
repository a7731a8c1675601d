//! The B-Tree handle: node store plus head pointer.

use std::path::Path;

use crate::buffer::{BufferPoolManager, StatsSnapshot};
use crate::common::config::IndexConfig;
use crate::common::{PageId, Result};
use crate::storage::DiskManager;

use super::head::{Geometry, HeadPointer, MetaPage, FLAG_BUILT};
use super::node::{Node, NodeLayout};
use super::node_store::NodeStore;

/// A disk-resident B-Tree over one node file.
///
/// Search, insert and verify live in their own modules as further `impl`
/// blocks on this type.
pub struct BTree {
    pub(super) store: NodeStore,
    pub(super) meta: MetaPage,
    pub(super) config: IndexConfig,
}

impl BTree {
    /// Create a node file holding an empty root.
    ///
    /// # Errors
    /// `Error::InvalidConfig` for an unusable configuration, I/O errors if
    /// the file exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let geometry = Geometry::from_config(&config);

        let dm = DiskManager::create(path.as_ref(), geometry.page_size)?;
        let pool = BufferPoolManager::new(config.pool_size, dm);
        let meta_page = pool.allocate_page_id()?;
        debug_assert_eq!(meta_page, PageId::META);

        let store = NodeStore::new(pool, NodeLayout::from(&config));
        let mut root = Node::detached(None);
        store.create(&mut root)?;

        let meta = MetaPage::new(geometry, root.id);
        meta.store(store.pool())?;

        tracing::info!(
            path = %path.as_ref().display(),
            order = config.order,
            key_max_len = config.key_max_len,
            page_size = geometry.page_size,
            "created index"
        );
        Ok(Self {
            store,
            meta,
            config,
        })
    }

    /// Open an existing node file.
    ///
    /// # Errors
    /// `Error::ConfigMismatch` if the file was created with a different
    /// order, key length or page size.
    pub fn open<P: AsRef<Path>>(path: P, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let geometry = MetaPage::peek(path.as_ref())?;
        geometry.check(&config)?;

        let dm = DiskManager::open(path.as_ref(), geometry.page_size)?;
        let pool = BufferPoolManager::new(config.pool_size, dm);
        let meta = MetaPage::load(&pool)?;
        let store = NodeStore::new(pool, NodeLayout::from(&config));

        tracing::info!(
            path = %path.as_ref().display(),
            root = meta.head.root.0,
            generation = meta.head.generation,
            built = meta.is_built(),
            "opened index"
        );
        Ok(Self {
            store,
            meta,
            config,
        })
    }

    pub fn head(&self) -> HeadPointer {
        self.meta.head
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn node_store(&self) -> &NodeStore {
        &self.store
    }

    /// Whether a bulk load has completed on this file.
    pub fn is_built(&self) -> bool {
        self.meta.is_built()
    }

    /// Record that a bulk load completed.
    pub fn mark_built(&mut self) -> Result<()> {
        let mut meta = self.meta;
        meta.flags |= FLAG_BUILT;
        meta.store(self.store.pool())?;
        self.meta = meta;
        Ok(())
    }

    /// Persist a new head pointer.
    pub(super) fn write_head(&mut self, head: HeadPointer) -> Result<()> {
        let mut meta = self.meta;
        meta.head = head;
        meta.store(self.store.pool())?;
        self.meta = meta;
        Ok(())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.store.pool().stats().snapshot()
    }

    /// Write back any page left dirty in the node cache.
    pub fn flush(&self) -> Result<()> {
        self.store.pool().flush_all_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Error, NodeId};
    use tempfile::tempdir;

    fn config() -> IndexConfig {
        IndexConfig::default().with_order(3).with_key_max_len(16)
    }

    #[test]
    fn test_create_writes_empty_root() {
        let dir = tempdir().unwrap();
        let tree = BTree::create(dir.path().join("t.idx"), config()).unwrap();

        let head = tree.head();
        assert_eq!(head.root, NodeId::new(1));
        assert_eq!(head.generation, 1);

        let root = tree.node_store().load(head.root).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.key_count(), 0);
        assert_eq!(root.parent, None);
        assert!(!tree.is_built());
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        BTree::create(&path, config()).unwrap();
        assert!(matches!(BTree::create(&path, config()), Err(Error::Io(_))));
    }

    #[test]
    fn test_open_restores_head_and_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        {
            let mut tree = BTree::create(&path, config()).unwrap();
            tree.mark_built().unwrap();
        }

        let tree = BTree::open(&path, config()).unwrap();
        assert_eq!(tree.head().root, NodeId::new(1));
        assert!(tree.is_built());
    }

    #[test]
    fn test_open_with_other_geometry_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        BTree::create(&path, config()).unwrap();

        let err = BTree::open(&path, config().with_key_max_len(17)).err().unwrap();
        assert!(matches!(
            err,
            Error::ConfigMismatch {
                field: "key_max_len",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempdir().unwrap();
        let err = BTree::create(dir.path().join("t.idx"), config().with_order(2))
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
