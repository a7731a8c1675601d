//! Error types for blobindex.

use thiserror::Error;

use crate::common::NodeId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in blobindex.
///
/// A key missing from the index is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the node file or the value store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist in the node file.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Node id was never allocated, or allocated but never written.
    #[error("{0} not found")]
    NodeNotFound(NodeId),

    /// A page failed its checksum or has an unexpected layout.
    #[error("Page {page} corrupted: {reason}")]
    Corrupted { page: u32, reason: String },

    /// Node cache has no free frames and every frame is pinned.
    #[error("No free frames available in node cache")]
    NoFreeFrames,

    /// A key or value is longer than the configured maximum.
    #[error("{what} length {len} exceeds maximum {max}")]
    CapacityExceeded {
        what: &'static str,
        len: u64,
        max: u64,
    },

    /// The value store holds a record that does not parse.
    #[error("Malformed record at offset {offset}: {reason}")]
    MalformedRecord { offset: u64, reason: String },

    /// A descriptor points past the end of the value store.
    #[error("Value at offset {offset} with length {length} exceeds store of {store_len} bytes")]
    ValueOutOfRange {
        offset: u64,
        length: u64,
        store_len: u64,
    },

    /// Insert of an existing key under `DuplicatePolicy::Reject`.
    #[error("Duplicate key")]
    DuplicateKey,

    /// An earlier bulk load stopped before finishing.
    #[error("Index exists but its bulk load never completed")]
    IncompleteBuild,

    /// The configuration cannot describe a working tree.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration disagrees with the geometry stored on disk.
    #[error("Configuration mismatch for {field}: stored {stored}, configured {configured}")]
    ConfigMismatch {
        field: &'static str,
        stored: u64,
        configured: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(42);
        assert_eq!(format!("{}", err), "Page 42 not found");

        let err = Error::NodeNotFound(NodeId::new(7));
        assert_eq!(format!("{}", err), "Node(7) not found");

        let err = Error::CapacityExceeded {
            what: "key",
            len: 300,
            max: 256,
        };
        assert_eq!(format!("{}", err), "key length 300 exceeds maximum 256");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let err: Error = std::io::Error::other("disk gone").into();
        assert!(err.source().is_some());
        assert!(Error::DuplicateKey.source().is_none());
    }
}
