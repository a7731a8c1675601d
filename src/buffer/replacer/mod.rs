//! Eviction policy for the node cache.
//!
//! - [`FifoReplacer`] - evicts the oldest unpinned frame

mod fifo;

pub use fifo::FifoReplacer;
