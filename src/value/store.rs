//! Value Store - the append-only blob values are read from.
//!
//! The index never writes to the store. It only needs the store's length and
//! positioned reads, which is all [`ValueStore`] asks for.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use parking_lot::Mutex;

use crate::common::{Error, Result};
use crate::value::ValueDescriptor;

/// Read-only, offset-addressable byte store.
pub trait ValueStore {
    /// Total bytes in the store.
    fn len(&self) -> Result<u64>;

    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// # Errors
    /// `Error::ValueOutOfRange` if the range reaches past the end.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Read the value a descriptor points at.
    fn read_value(&self, value: ValueDescriptor) -> Result<Vec<u8>> {
        let store_len = self.len()?;
        match value.end() {
            Some(end) if end <= store_len => {}
            _ => {
                return Err(Error::ValueOutOfRange {
                    offset: value.offset,
                    length: value.length,
                    store_len,
                })
            }
        }

        let mut buf = vec![0u8; value.length as usize];
        self.read_at(value.offset, &mut buf)?;
        Ok(buf)
    }
}

fn check_range(offset: u64, length: usize, store_len: u64) -> Result<()> {
    let length = length as u64;
    match offset.checked_add(length) {
        Some(end) if end <= store_len => Ok(()),
        _ => Err(Error::ValueOutOfRange {
            offset,
            length,
            store_len,
        }),
    }
}

/// An in-memory store, mostly for tests and small blobs.
impl ValueStore for Vec<u8> {
    fn len(&self) -> Result<u64> {
        Ok(self.as_slice().len() as u64)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len(), self.as_slice().len() as u64)?;
        let start = offset as usize;
        buf.copy_from_slice(&self[start..start + buf.len()]);
        Ok(())
    }
}

/// A value store backed by a file on disk.
///
/// The length is re-read on every call so that bytes appended by another
/// writer become visible.
pub struct FileValueStore {
    file: Mutex<File>,
}

impl FileValueStore {
    /// Open an existing value file read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ValueStore for FileValueStore {
    fn len(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut file = self.file.lock();
        check_range(offset, buf.len(), file.metadata()?.len())?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }
}
