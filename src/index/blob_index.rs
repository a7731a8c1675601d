//! The public index handle.

use std::path::Path;

use parking_lot::RwLock;

use crate::buffer::StatsSnapshot;
use crate::common::config::{DuplicatePolicy, IndexConfig};
use crate::common::{Error, Result};
use crate::index::btree::{BTree, HeadPointer, InsertOutcome, TreeReport};
use crate::index::loader::{load_records, LoadSummary};
use crate::value::{ValueDescriptor, ValueStore};

/// What [`BlobIndex::build`] or [`BlobIndex::resume_build`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A new index file was created and loaded.
    Created(LoadSummary),
    /// An interrupted load was run again over the existing file.
    Resumed(LoadSummary),
    /// The index file already existed; nothing was loaded.
    Skipped,
}

/// A B-Tree index from keys to values in a [`ValueStore`].
///
/// Writers (`insert`, the bulk load) hold an exclusive lock for the whole insert,
/// splits included. Readers (`lookup`, `descriptor`, `verify`) share a lock,
/// so they never see a half-split tree.
///
/// # Example
/// ```no_run
/// use blobindex::{BlobIndex, BuildOutcome, FileValueStore, IndexConfig};
///
/// let values = FileValueStore::open("values.dat")?;
/// let (index, outcome) = BlobIndex::build("values.idx", IndexConfig::default(), values)?;
/// if let BuildOutcome::Created(summary) = outcome {
///     println!("loaded {} records", summary.records);
/// }
///
/// if let Some(value) = index.lookup(b"some key")? {
///     println!("{} bytes", value.len());
/// }
/// # Ok::<(), blobindex::Error>(())
/// ```
pub struct BlobIndex<V> {
    tree: RwLock<BTree>,
    values: V,
}

impl<V: ValueStore> BlobIndex<V> {
    /// Create an empty index at `path`.
    pub fn create<P: AsRef<Path>>(path: P, config: IndexConfig, values: V) -> Result<Self> {
        let tree = BTree::create(path, config)?;
        Ok(Self::with_tree(tree, values))
    }

    /// Open an existing index at `path`.
    ///
    /// # Errors
    /// `Error::ConfigMismatch` if `config` disagrees with the order, key
    /// length or page size the file was created with.
    pub fn open<P: AsRef<Path>>(path: P, config: IndexConfig, values: V) -> Result<Self> {
        let tree = BTree::open(path, config)?;
        Ok(Self::with_tree(tree, values))
    }

    /// Build the index at `path` from the records in `values`.
    ///
    /// When an index file already exists at `path` it is opened as is and
    /// nothing is loaded, whether or not its own load ran to completion.
    /// Use [`BlobIndex::resume_build`] to finish an interrupted load.
    ///
    /// # Errors
    /// - `Error::MalformedRecord` for a record that does not parse
    /// - `Error::ConfigMismatch` if an existing file disagrees with `config`
    pub fn build<P: AsRef<Path>>(
        path: P,
        config: IndexConfig,
        values: V,
    ) -> Result<(Self, BuildOutcome)> {
        let path = path.as_ref();

        if !path.exists() {
            let mut tree = BTree::create(path, config)?;
            let summary = load_records(&mut tree, &values)?;
            tree.mark_built()?;
            return Ok((Self::with_tree(tree, values), BuildOutcome::Created(summary)));
        }

        let tree = BTree::open(path, config)?;
        if tree.is_built() {
            tracing::info!(path = %path.display(), "index already exists");
        } else {
            tracing::warn!(
                path = %path.display(),
                "index exists but was never marked built; not loading"
            );
        }
        Ok((Self::with_tree(tree, values), BuildOutcome::Skipped))
    }

    /// Finish a bulk load that was interrupted.
    ///
    /// An index marked built is left alone. Otherwise the load runs again
    /// from the start of `values`, which is safe only under
    /// `DuplicatePolicy::Overwrite`, where re-inserting a record rewrites the
    /// same descriptor. A missing file is built from scratch.
    ///
    /// # Errors
    /// - `Error::IncompleteBuild` for an unfinished load under any other
    ///   policy
    /// - `Error::MalformedRecord` for a record that does not parse
    pub fn resume_build<P: AsRef<Path>>(
        path: P,
        config: IndexConfig,
        values: V,
    ) -> Result<(Self, BuildOutcome)> {
        let path = path.as_ref();
        if !path.exists() {
            return Self::build(path, config, values);
        }

        let mut tree = BTree::open(path, config)?;
        if tree.is_built() {
            return Ok((Self::with_tree(tree, values), BuildOutcome::Skipped));
        }
        if tree.config().duplicate_policy != DuplicatePolicy::Overwrite {
            return Err(Error::IncompleteBuild);
        }

        tracing::warn!(
            path = %path.display(),
            generation = tree.head().generation,
            "resuming interrupted bulk load"
        );
        let summary = load_records(&mut tree, &values)?;
        tree.mark_built()?;
        Ok((Self::with_tree(tree, values), BuildOutcome::Resumed(summary)))
    }

    fn with_tree(tree: BTree, values: V) -> Self {
        Self {
            tree: RwLock::new(tree),
            values,
        }
    }

    /// Insert `key` mapped to `length` bytes at `offset` in the value store.
    ///
    /// The range is not checked against the store; a bad range surfaces on
    /// lookup.
    pub fn insert(&self, key: &[u8], length: u64, offset: u64) -> Result<InsertOutcome> {
        self.tree
            .write()
            .insert(key, ValueDescriptor::new(length, offset))
    }

    /// The value stored for `key`, or `None` if the key is absent.
    ///
    /// # Errors
    /// `Error::ValueOutOfRange` if the descriptor reaches past the end of the
    /// value store.
    pub fn lookup(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.descriptor(key)? {
            Some(value) => self.values.read_value(value).map(Some),
            None => Ok(None),
        }
    }

    /// The descriptor stored for `key`, without reading the value.
    pub fn descriptor(&self, key: &[u8]) -> Result<Option<ValueDescriptor>> {
        let tree = self.tree.read();
        Ok(tree.search(key)?.value())
    }

    pub fn head(&self) -> HeadPointer {
        self.tree.read().head()
    }

    /// Check the structure of the whole tree.
    pub fn verify(&self) -> Result<TreeReport> {
        self.tree.read().verify()
    }

    /// Node cache statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.tree.read().stats()
    }

    pub fn flush(&self) -> Result<()> {
        self.tree.read().flush()
    }

    pub fn config(&self) -> IndexConfig {
        self.tree.read().config().clone()
    }

    pub fn values(&self) -> &V {
        &self.values
    }
}
