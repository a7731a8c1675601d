//! Disk-resident B-Tree.
//!
//! Nodes are pages in one node file and refer to each other by [`NodeId`]
//! (a page number). Page 0 is the meta page holding the [`HeadPointer`].
//!
//! # Components
//! - [`Node`] / [`NodeLayout`] - In-memory node and its page encoding
//! - [`NodeStore`] - Create, load and store nodes by id
//! - [`HeadPointer`] / [`MetaPage`] - Root, generation and file geometry
//! - [`BTree`] - The tree handle; search, insert and verify
//!
//! [`NodeId`]: crate::common::NodeId

mod head;
mod insert;
mod node;
mod node_store;
mod search;
mod tree;
mod verify;

pub use head::{Geometry, HeadPointer, MetaPage, FLAG_BUILT, FORMAT_VERSION, MAGIC};
pub use insert::{insert_at, split_node, InsertOutcome};
pub use node::{Node, NodeLayout};
pub use node_store::NodeStore;
pub use search::{search_node, SearchResult};
pub use tree::BTree;
pub use verify::TreeReport;
