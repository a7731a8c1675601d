//! Value descriptors.

use std::fmt;

/// Location of a value in the value store: `length` bytes starting at
/// `offset`.
///
/// The index stores descriptors and never interprets them; only lookup
/// resolves them against a [`ValueStore`](super::ValueStore).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueDescriptor {
    pub length: u64,
    pub offset: u64,
}

impl ValueDescriptor {
    pub fn new(length: u64, offset: u64) -> Self {
        Self { length, offset }
    }

    /// One past the last byte, or None on overflow.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

impl fmt::Display for ValueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..+{}]", self.offset, self.length)
    }
}
