//! Bulk Loader - populate a tree from the records of a value store.

use crate::common::config::LOAD_PROGRESS_INTERVAL;
use crate::common::Result;
use crate::index::btree::{BTree, InsertOutcome};
use crate::value::{RecordReader, ValueStore};

/// Counters from one bulk load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records read from the store.
    pub records: u64,
    /// Records whose key was new.
    pub inserted: u64,
    /// Records whose key replaced an existing descriptor.
    pub replaced: u64,
}

/// Insert every record of `store` into `tree`, in store order.
///
/// Each record goes through the same search and insert as a single
/// [`BTree::insert`]. The first malformed record stops the load; records
/// before it stay inserted.
///
/// # Errors
/// `Error::MalformedRecord` or `Error::CapacityExceeded` from the reader,
/// and any insert error.
pub fn load_records<V: ValueStore + ?Sized>(tree: &mut BTree, store: &V) -> Result<LoadSummary> {
    let config = tree.config().clone();
    let mut reader = RecordReader::new(store, config.key_max_len, config.max_value_len)?;
    let mut summary = LoadSummary::default();

    while let Some(record) = reader.next() {
        let record = record?;
        match tree.insert(&record.key, record.value)? {
            InsertOutcome::Inserted => summary.inserted += 1,
            InsertOutcome::Replaced => summary.replaced += 1,
        }
        summary.records += 1;

        if summary.records % LOAD_PROGRESS_INTERVAL == 0 {
            tracing::info!(
                records = summary.records,
                offset = reader.position(),
                generation = tree.head().generation,
                "bulk load progress"
            );
        }
    }

    tracing::info!(
        records = summary.records,
        inserted = summary.inserted,
        replaced = summary.replaced,
        "bulk load complete"
    );
    Ok(summary)
}
