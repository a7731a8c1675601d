//! Storage layer - the node file and its page format.
//!
//! - [`DiskManager`] - Low-level file I/O
//! - [`page`] - Page buffer and header

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
