//! The value side of the index.
//!
//! - [`ValueDescriptor`] - `(length, offset)` of a value
//! - [`ValueStore`] - the append-only blob values are read from
//! - [`RecordReader`] - parser for the bulk-load record format

mod descriptor;
mod record;
mod store;

pub use descriptor::ValueDescriptor;
pub use record::{Record, RecordReader};
pub use store::{FileValueStore, ValueStore};
