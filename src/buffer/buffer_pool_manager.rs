//! Buffer Pool Manager - the node cache.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between the node file and memory
//! - Pin-based reference counting through page guards
//! - Write-through commits and dirty page write-back
//! - FIFO eviction

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskManager;

/// Bookkeeping that must change atomically with pin counts.
struct PoolState {
    /// Maps page IDs to frame IDs.
    page_table: HashMap<PageId, FrameId>,
    /// Stack of free frame IDs.
    free_list: Vec<FrameId>,
    /// Eviction policy.
    replacer: FifoReplacer,
}

/// Manages a pool of frames caching pages of the node file.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────────────────┐  ┌────────────────────────┐   │
/// │  │ state: Mutex<PoolState>  │  │  frames: Vec<Frame>    │   │
/// │  │  page_table PageId → Fid │─▶│  [F0] [F1] [F2] ...    │   │
/// │  │  free_list, replacer     │  └────────────────────────┘   │
/// │  └──────────────────────────┘  ┌────────────────────────┐   │
/// │                                │ disk_manager: Mutex    │   │
/// │                                └────────────────────────┘   │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `state`: one `Mutex` for the page table, free list and replacer. Pin
///   counts change only under it, so a frame is never chosen as a victim
///   between being looked up and being pinned.
/// - `disk_manager`: `Mutex`, single-threaded I/O
/// - `frames`: fixed size, each Frame has internal locks
/// - `stats`: atomic counters
///
/// Lock order is `state` → frame page lock → `disk_manager`. Guards release
/// `state` before their page lock, and the pool never waits on the page lock
/// of a pinned frame while holding `state`.
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    disk_manager: Mutex<DiskManager>,
    stats: BufferPoolStats,
    pool_size: usize,
    page_size: usize,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager over `disk_manager`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let page_size = disk_manager.page_size();
        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new(page_size)).collect();
        let free_list: Vec<FrameId> = (0..pool_size).rev().map(FrameId::new).collect();

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                replacer: FifoReplacer::new(),
            }),
            disk_manager: Mutex::new(disk_manager),
            stats: BufferPoolStats::new(),
            pool_size,
            page_size,
        }
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: Allocate pages
    // ========================================================================

    /// Allocate a page on disk and cache it, returning a write guard over the
    /// zeroed page.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - I/O errors from disk allocation
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let (frame_id, page_id) = {
            let mut state = self.state.lock();
            let frame_id = self.take_frame(&mut state)?;

            let page_id = match self.disk_manager.lock().allocate_page() {
                Ok(page_id) => page_id,
                Err(e) => {
                    state.free_list.push(frame_id);
                    return Err(e);
                }
            };

            let frame = &self.frames[frame_id.0];
            frame.page_mut().reset();
            frame.set_page_id(Some(page_id));
            frame.pin();

            state.page_table.insert(page_id, frame_id);
            state.replacer.record_access(frame_id);
            state.replacer.set_evictable(frame_id, false);

            (frame_id, page_id)
        };

        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Allocate a page on disk without caching it.
    pub fn allocate_page_id(&self) -> Result<PageId> {
        self.disk_manager.lock().allocate_page()
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Flush a specific page to disk if it's dirty.
    ///
    /// # Errors
    /// - I/O errors from disk write
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = {
            let mut state = self.state.lock();
            let Some(frame_id) = state.page_table.get(&page_id).copied() else {
                return Ok(());
            };
            // Pinned so it cannot be evicted once `state` is released.
            self.frames[frame_id.0].pin();
            state.replacer.set_evictable(frame_id, false);
            frame_id
        };

        let result = self.flush_frame(frame_id, page_id);
        self.unpin_page_internal(frame_id, false);
        result
    }

    /// Flush all dirty pages to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<PageId> = self.state.lock().page_table.keys().copied().collect();

        for page_id in pages {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of pages currently cached.
    pub fn cached_page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Number of pages in the node file.
    pub fn disk_page_count(&self) -> u32 {
        self.disk_manager.lock().page_count()
    }

    // ========================================================================
    // Internal: Called by page guards
    // ========================================================================

    /// Unpin a page. Called by PageReadGuard/PageWriteGuard on drop.
    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let mut state = self.state.lock();
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }
        if frame.unpin() == 0 {
            state.replacer.set_evictable(frame_id, true);
        }
    }

    /// Write a page held under a write guard straight to disk.
    pub(crate) fn write_through(&self, frame_id: FrameId, page_id: PageId, page: &Page) -> Result<()> {
        self.disk_manager.lock().write_page(page_id, page)?;
        self.frames[frame_id.0].clear_dirty();
        self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Bring a page into the pool and pin it, returning its frame.
    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        let mut state = self.state.lock();

        let cached = state.page_table.get(&page_id).copied();
        if let Some(frame_id) = cached {
            self.frames[frame_id.0].pin();
            state.replacer.record_access(frame_id);
            state.replacer.set_evictable(frame_id, false);
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(frame_id);
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.take_frame(&mut state)?;
        let frame = &self.frames[frame_id.0];

        {
            let mut page = frame.page_mut();
            let read = self.disk_manager.lock().read_page_into(page_id, &mut page);
            if let Err(e) = read {
                state.free_list.push(frame_id);
                return Err(e);
            }
        }
        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);

        frame.set_page_id(Some(page_id));
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        state.replacer.record_access(frame_id);
        state.replacer.set_evictable(frame_id, false);

        Ok(frame_id)
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    /// Get an empty frame, evicting if necessary.
    fn take_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop() {
            return Ok(frame_id);
        }

        let frame_id = state.replacer.evict().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.0];

        if let Some(old_page_id) = frame.page_id() {
            if let Err(e) = self.flush_frame(frame_id, old_page_id) {
                // Still cached and still dirty; make it a candidate again.
                state.replacer.record_access(frame_id);
                state.replacer.set_evictable(frame_id, true);
                return Err(e);
            }
            state.page_table.remove(&old_page_id);
        }

        frame.clear_dirty();
        frame.set_page_id(None);
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);

        Ok(frame_id)
    }

    /// Flush a frame to disk if dirty.
    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        if frame.is_dirty() {
            let page = frame.page();
            self.disk_manager.lock().write_page(page_id, &page)?;
            drop(page);

            frame.clear_dirty();
            self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAGE: usize = 4096;

    /// Helper to create a pool over a temporary node file.
    fn create_test_pool(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.idx"), PAGE).unwrap();
        (BufferPoolManager::new(pool_size, dm), dir)
    }

    #[test]
    fn test_new_page_ids_are_sequential() {
        let (pool, _dir) = create_test_pool(4);

        let guard = pool.new_page().unwrap();
        assert_eq!(guard.page_id(), PageId::new(0));
        drop(guard);

        let guard = pool.new_page().unwrap();
        assert_eq!(guard.page_id(), PageId::new(1));
        assert_eq!(pool.disk_page_count(), 2);
    }

    #[test]
    fn test_commit_writes_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        {
            let pool = BufferPoolManager::new(4, DiskManager::create(&path, PAGE).unwrap());
            let mut guard = pool.new_page().unwrap();
            guard.as_mut_slice()[10] = 0xAB;
            guard.commit().unwrap();

            assert_eq!(pool.stats().snapshot().pages_written, 1);
            // No flush: the commit alone must have reached the file.
        }

        let mut dm = DiskManager::open(&path, PAGE).unwrap();
        let mut page = Page::new(PAGE);
        dm.read_page_into(PageId::new(0), &mut page).unwrap();
        assert_eq!(page.as_slice()[10], 0xAB);
    }

    #[test]
    fn test_uncommitted_write_flushed_on_eviction() {
        let (pool, _dir) = create_test_pool(1);

        {
            let mut guard = pool.new_page().unwrap();
            guard.as_mut_slice()[0] = 0x42;
        }

        // Evicts page 0, which is dirty.
        drop(pool.new_page().unwrap());
        assert_eq!(pool.stats().snapshot().evictions, 1);

        let guard = pool.fetch_page_read(PageId::new(0)).unwrap();
        assert_eq!(guard.as_slice()[0], 0x42);
    }

    #[test]
    fn test_cache_hit_and_miss() {
        let (pool, _dir) = create_test_pool(4);
        let page_id = pool.allocate_page_id().unwrap();

        drop(pool.fetch_page_read(page_id).unwrap());
        drop(pool.fetch_page_read(page_id).unwrap());

        let snapshot = pool.stats().snapshot();
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.pages_read, 1);
    }

    #[test]
    fn test_no_free_frames() {
        let (pool, _dir) = create_test_pool(2);

        let _guard1 = pool.new_page().unwrap();
        let _guard2 = pool.new_page().unwrap();

        assert!(matches!(pool.new_page(), Err(Error::NoFreeFrames)));
    }

    #[test]
    fn test_pin_count_tracking() {
        let (pool, _dir) = create_test_pool(4);
        let page_id = pool.new_page().unwrap().page_id();

        let frame = pool
            .frames
            .iter()
            .find(|f| f.page_id() == Some(page_id))
            .unwrap();
        assert!(frame.is_evictable());

        let guard = pool.fetch_page_read(page_id).unwrap();
        assert_eq!(frame.pin_count(), 1);
        assert!(!frame.is_evictable());

        drop(guard);
        assert_eq!(frame.pin_count(), 0);
        assert!(frame.is_evictable());
    }

    #[test]
    fn test_failed_read_returns_frame() {
        let (pool, _dir) = create_test_pool(2);

        assert!(matches!(
            pool.fetch_page_read(PageId::new(99)),
            Err(Error::PageNotFound(99))
        ));
        assert_eq!(pool.free_frame_count(), 2);
    }

    #[test]
    fn test_flush_all_pages() {
        let (pool, _dir) = create_test_pool(8);

        for i in 0..5u8 {
            let mut guard = pool.new_page().unwrap();
            guard.as_mut_slice()[0] = i;
        }
        pool.flush_all_pages().unwrap();

        assert_eq!(pool.stats().snapshot().pages_written, 5);
        // Nothing left dirty.
        pool.flush_all_pages().unwrap();
        assert_eq!(pool.stats().snapshot().pages_written, 5);
    }

    #[test]
    fn test_concurrent_reads() {
        use std::sync::Arc;
        use std::thread;

        // One frame per thread: a fetching thread holds no guard, so at most
        // seven frames are pinned when it needs one.
        let (pool, _dir) = create_test_pool(8);
        let pool = Arc::new(pool);

        let mut ids = vec![];
        for i in 0..12u8 {
            let mut guard = pool.new_page().unwrap();
            guard.as_mut_slice()[0] = i;
            ids.push(guard.page_id());
            guard.commit().unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pool = Arc::clone(&pool);
                let ids = ids.clone();
                thread::spawn(move || {
                    for round in 0..50 {
                        let idx = (t + round) % ids.len();
                        let guard = pool.fetch_page_read(ids[idx]).unwrap();
                        assert_eq!(guard.as_slice()[0], idx as u8);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
