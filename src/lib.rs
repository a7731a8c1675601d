//! blobindex - A disk-resident B-Tree index over an append-only value blob.
//!
//! Keys map to `(length, offset)` descriptors into a value store the index
//! never writes. The tree lives in its own node file, one node per page.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           BlobIndex                             │
//! │          build / insert / lookup / descriptor / verify          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────────┐  ┌────────────────────────┐   │
//! │  │   Index Layer (index/)       │  │  Value Layer (value/)  │   │
//! │  │  BTree: search, insert,      │  │  ValueStore            │   │
//! │  │  split, promote, verify      │  │  RecordReader          │   │
//! │  │  Bulk loader                 │◀─│  ValueDescriptor       │   │
//! │  └──────────────────────────────┘  └────────────────────────┘   │
//! │                 ↓                                               │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │      NodeStore + MetaPage (index/btree/)                │    │
//! │  │      NodeId ↔ page, head pointer, file geometry         │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │                 ↓                                               │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │      Node cache (buffer/)                               │    │
//! │  │      BufferPoolManager + Frame + FIFO + Statistics      │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │                 ↓                                               │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │      Storage Layer (storage/)                           │    │
//! │  │      DiskManager + Page + PageHeader (CRC32)            │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, NodeId, FrameId, Error, config)
//! - [`value`] - Value store access and the bulk-load record format
//! - [`index`] - The B-Tree, bulk loader and [`BlobIndex`]
//! - [`buffer`] - Node cache
//! - [`storage`] - Node file I/O and page formats
//!
//! # Quick Start
//! ```no_run
//! use blobindex::{BlobIndex, IndexConfig};
//!
//! let values = b"hello world".to_vec();
//! let index = BlobIndex::create("words.idx", IndexConfig::default(), values)?;
//!
//! index.insert(b"greeting", 5, 0)?;
//! assert_eq!(index.lookup(b"greeting")?.as_deref(), Some(&b"hello"[..]));
//! assert_eq!(index.lookup(b"farewell")?, None);
//! # Ok::<(), blobindex::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;
pub mod value;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DuplicatePolicy, IndexConfig};
pub use common::{Error, FrameId, NodeId, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, StatsSnapshot};
pub use index::btree::{HeadPointer, InsertOutcome, TreeReport};
pub use index::loader::LoadSummary;
pub use index::{BlobIndex, BuildOutcome};
pub use value::{FileValueStore, Record, RecordReader, ValueDescriptor, ValueStore};
