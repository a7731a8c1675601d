//! Disk Manager - low-level file I/O for the node file.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages
//! - Allocating new pages
//! - Managing the node file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single node file.
///
/// # File Layout
/// Pages of `page_size` bytes laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (meta)  │ (node)  │ (node)  │         │ (node)  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// Page N is located at file offset `N × page_size`.
///
/// # Allocation
/// The file length is the high-water mark for page ids. Allocation extends
/// the file and syncs it before returning, so an id handed out once is never
/// handed out again, even by a later process opening the same file.
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. The `BufferPoolManager` is responsible
/// for serializing access to the disk manager.
///
/// # Durability
/// All writes are followed by `fsync()`.
pub struct DiskManager {
    file: File,
    page_size: usize,
    /// Number of pages in the file.
    page_count: u32,
}

impl DiskManager {
    /// Create a new node file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_size,
            page_count: 0,
        })
    }

    /// Open an existing node file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened, and
    /// `Error::Corrupted` if its length is not a whole number of pages.
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size % page_size as u64 != 0 {
            return Err(Error::Corrupted {
                page: (file_size / page_size as u64) as u32,
                reason: format!(
                    "file length {} is not a multiple of page size {}",
                    file_size, page_size
                ),
            });
        }
        let page_count = (file_size / page_size as u64) as u32;

        Ok(Self {
            file,
            page_size,
            page_count,
        })
    }

    /// Read a page from disk into an existing buffer.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page_into(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }
        debug_assert_eq!(page.size(), self.page_size);

        self.file
            .seek(SeekFrom::Start(page_id.file_offset(self.page_size)))?;
        self.file.read_exact(page.as_mut_slice())?;
        Ok(())
    }

    /// Write a page to disk.
    ///
    /// The page must have been previously allocated with `allocate_page()`.
    ///
    /// # Durability
    /// This method calls `fsync()` after writing.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }
        debug_assert_eq!(page.size(), self.page_size);

        self.file
            .seek(SeekFrom::Start(page_id.file_offset(self.page_size)))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Allocate a new zeroed page at the end of the file.
    ///
    /// # Durability
    /// The file is extended and synced before the id is returned.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if self.page_count == PageId::INVALID.0 {
            return Err(Error::Corrupted {
                page: self.page_count,
                reason: "node file is out of page ids".to_string(),
            });
        }
        let page_id = PageId::new(self.page_count);

        self.file
            .seek(SeekFrom::Start(page_id.file_offset(self.page_size)))?;
        self.file.write_all(&vec![0u8; self.page_size])?;
        self.file.sync_all()?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Get the number of pages in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Get the total size of the file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (self.page_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAGE: usize = 4096;

    fn read(dm: &mut DiskManager, page_id: PageId) -> Result<Page> {
        let mut page = Page::new(dm.page_size());
        dm.read_page_into(page_id, &mut page)?;
        Ok(page)
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        DiskManager::create(&path, PAGE).unwrap();
        assert!(DiskManager::create(&path, PAGE).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        assert!(DiskManager::open(dir.path().join("missing.idx"), PAGE).is_err());
    }

    #[test]
    fn test_allocate_and_read_page() {
        let dir = tempdir().unwrap();
        let mut dm = DiskManager::create(dir.path().join("test.idx"), PAGE).unwrap();

        let page_id = dm.allocate_page().unwrap();
        assert_eq!(page_id, PageId::new(0));
        assert_eq!(dm.page_count(), 1);

        let page = read(&mut dm, page_id).unwrap();
        assert_eq!(page.size(), PAGE);
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_persistence_with_large_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let page_size = 3 * PAGE;

        {
            let mut dm = DiskManager::create(&path, page_size).unwrap();
            dm.allocate_page().unwrap();
            let page_id = dm.allocate_page().unwrap();

            let mut page = Page::new(page_size);
            page.as_mut_slice()[page_size - 1] = 0x42;
            dm.write_page(page_id, &page).unwrap();
        }

        let mut dm = DiskManager::open(&path, page_size).unwrap();
        assert_eq!(dm.page_count(), 2);
        assert_eq!(dm.file_size(), 2 * page_size as u64);
        let page = read(&mut dm, PageId::new(1)).unwrap();
        assert_eq!(page.as_slice()[page_size - 1], 0x42);
    }

    #[test]
    fn test_allocation_continues_after_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        {
            let mut dm = DiskManager::create(&path, PAGE).unwrap();
            for _ in 0..3 {
                dm.allocate_page().unwrap();
            }
        }

        let mut dm = DiskManager::open(&path, PAGE).unwrap();
        assert_eq!(dm.allocate_page().unwrap(), PageId::new(3));
    }

    #[test]
    fn test_open_with_wrong_page_size_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        {
            let mut dm = DiskManager::create(&path, PAGE).unwrap();
            dm.allocate_page().unwrap();
        }

        let err = DiskManager::open(&path, 3 * PAGE).err().unwrap();
        assert!(matches!(err, Error::Corrupted { .. }));
    }

    #[test]
    fn test_read_and_write_unallocated_page() {
        let dir = tempdir().unwrap();
        let mut dm = DiskManager::create(dir.path().join("test.idx"), PAGE).unwrap();
        dm.allocate_page().unwrap();

        assert!(matches!(
            read(&mut dm, PageId::new(1)),
            Err(Error::PageNotFound(1))
        ));
        assert!(dm.write_page(PageId::new(5), &Page::new(PAGE)).is_err());
    }
}
