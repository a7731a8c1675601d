//! Configuration for a blobindex instance.
//!
//! Format constants live here next to [`IndexConfig`], the runtime knobs an
//! index is created with. The order and key length fix the node page
//! geometry, so they are persisted in the meta page and checked on open.

use crate::common::{Error, Result};

/// Granularity of node pages on disk.
///
/// Node pages are rounded up to a multiple of this so that every page starts
/// on an OS page boundary.
pub const PAGE_ALIGN: usize = 4096;

/// Default maximum number of keys per node (M).
pub const DEFAULT_ORDER: usize = 64;

/// Default maximum key length in bytes.
pub const DEFAULT_KEY_MAX_LEN: usize = 256;

/// Default maximum value length in bytes.
pub const DEFAULT_MAX_VALUE_LEN: u64 = u32::MAX as u64;

/// Default number of frames in the node cache.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Records between progress lines logged by the bulk loader.
pub const LOAD_PROGRESS_INTERVAL: u64 = 100_000;

/// Smallest order for which a split leaves both halves non-empty.
pub const MIN_ORDER: usize = 3;

/// Largest supported order. Key counts are stored as `u32` but a node of this
/// order with short keys is already several megabytes.
pub const MAX_ORDER: usize = u16::MAX as usize;

/// The node cache needs room for a node, its parent, a sibling and a child
/// pinned at the same time during a split.
pub const MIN_POOL_SIZE: usize = 4;

/// Bytes before the slot arrays in a node page:
/// page header (5) + key_count (4) + parent (4).
pub const NODE_HEADER_SIZE: usize = 13;

/// Bytes per child slot.
pub const CHILD_SLOT_SIZE: usize = 4;

/// Bytes per value slot: length (8) + offset (8).
pub const VALUE_SLOT_SIZE: usize = 16;

/// Bytes of the length prefix in front of each key slot.
pub const KEY_LEN_PREFIX: usize = 2;

/// What an insert does when the key is already present.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Replace the stored descriptor in place. The last write wins.
    #[default]
    Overwrite,
    /// Fail the insert with [`Error::DuplicateKey`].
    Reject,
    /// Store the key again after every equal key. A lookup returns the
    /// first copy met on the way down from the root; within one node that
    /// is the last of the equal run.
    Append,
}

impl DuplicatePolicy {
    /// Code stored in the meta page.
    pub fn to_raw(self) -> u32 {
        match self {
            DuplicatePolicy::Overwrite => 0,
            DuplicatePolicy::Reject => 1,
            DuplicatePolicy::Append => 2,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(DuplicatePolicy::Overwrite),
            1 => Some(DuplicatePolicy::Reject),
            2 => Some(DuplicatePolicy::Append),
            _ => None,
        }
    }
}

/// Runtime configuration of an index.
///
/// # Example
/// ```
/// use blobindex::common::config::{DuplicatePolicy, IndexConfig};
///
/// let config = IndexConfig::default()
///     .with_order(3)
///     .with_key_max_len(16)
///     .with_duplicate_policy(DuplicatePolicy::Reject);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.node_page_size(), 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum keys per node (M). A node reaching M keys splits.
    pub order: usize,
    /// Maximum key length in bytes.
    pub key_max_len: usize,
    /// Maximum value length accepted by inserts and the bulk loader.
    pub max_value_len: u64,
    /// Number of node pages cached in memory.
    pub pool_size: usize,
    /// Behavior when inserting a key that already exists.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            key_max_len: DEFAULT_KEY_MAX_LEN,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            pool_size: DEFAULT_POOL_SIZE,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl IndexConfig {
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn with_key_max_len(mut self, key_max_len: usize) -> Self {
        self.key_max_len = key_max_len;
        self
    }

    pub fn with_max_value_len(mut self, max_value_len: u64) -> Self {
        self.max_value_len = max_value_len;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Check that the configuration describes a usable tree.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ORDER..=MAX_ORDER).contains(&self.order) {
            return Err(Error::InvalidConfig(format!(
                "order must be in {}..={}, got {}",
                MIN_ORDER, MAX_ORDER, self.order
            )));
        }
        if self.key_max_len == 0 || self.key_max_len > u16::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "key_max_len must be in 1..={}, got {}",
                u16::MAX,
                self.key_max_len
            )));
        }
        if self.pool_size < MIN_POOL_SIZE {
            return Err(Error::InvalidConfig(format!(
                "pool_size must be at least {}, got {}",
                MIN_POOL_SIZE, self.pool_size
            )));
        }
        if self.node_page_size() > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "node page of {} bytes is too large",
                self.node_page_size()
            )));
        }
        Ok(())
    }

    /// Bytes a node needs before alignment.
    ///
    /// Capacity for M keys, M values and M + 1 children is reserved so that a
    /// node can be encoded at any fill level below overflow.
    pub fn node_footprint(&self) -> usize {
        NODE_HEADER_SIZE
            + (self.order + 1) * CHILD_SLOT_SIZE
            + self.order * VALUE_SLOT_SIZE
            + self.order * (KEY_LEN_PREFIX + self.key_max_len)
    }

    /// Size of one page in the node file.
    pub fn node_page_size(&self) -> usize {
        self.node_footprint().div_ceil(PAGE_ALIGN) * PAGE_ALIGN
    }

    /// Split point `s = ceil(M / 2)`, as a 1-based slot number.
    pub fn split_slot(&self) -> usize {
        self.order.div_ceil(2)
    }
}
