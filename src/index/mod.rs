//! Index layer.
//!
//! - [`btree`] - The disk-resident B-Tree
//! - [`loader`] - Bulk load from value store records
//! - [`BlobIndex`] - Public handle pairing a tree with its value store

pub mod btree;
mod blob_index;
pub mod loader;

pub use blob_index::{BlobIndex, BuildOutcome};
