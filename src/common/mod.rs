//! Common types shared across blobindex.
//!
//! - Configuration ([`config::IndexConfig`]) and format constants
//! - Error types
//! - Identifiers (PageId, NodeId, FrameId)

pub mod config;
pub mod error;
mod frame_id;
mod node_id;
mod page_id;

pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use node_id::NodeId;
pub use page_id::PageId;
