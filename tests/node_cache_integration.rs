//! Integration tests for the node cache and the node file beneath it.

use std::sync::Arc;
use std::thread;

use blobindex::storage::DiskManager;
use blobindex::{BufferPoolManager, PageId};
use tempfile::tempdir;

const PAGE_SIZE: usize = 8192;

fn create_pool(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let dm = DiskManager::create(dir.path().join("nodes.idx"), PAGE_SIZE).unwrap();
    (BufferPoolManager::new(pool_size, dm), dir)
}

/// Pages left dirty survive being evicted and read back.
#[test]
fn test_dirty_pages_survive_eviction() {
    let (pool, _dir) = create_pool(2);

    let mut page_ids = vec![];
    for i in 0u8..6 {
        let mut guard = pool.new_page().unwrap();
        guard.as_mut_slice()[0] = i;
        guard.as_mut_slice()[PAGE_SIZE - 1] = i.wrapping_mul(5);
        page_ids.push(guard.page_id());
    }

    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = pool.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[0], i as u8);
        assert_eq!(guard.as_slice()[PAGE_SIZE - 1], (i as u8).wrapping_mul(5));
    }
}

/// A committed page is on disk without any flush.
#[test]
fn test_commit_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nodes.idx");
    let data = b"committed node";

    let pid = {
        let dm = DiskManager::create(&path, PAGE_SIZE).unwrap();
        let pool = BufferPoolManager::new(4, dm);

        let mut guard = pool.new_page().unwrap();
        let pid = guard.page_id();
        guard.as_mut_slice()[..data.len()].copy_from_slice(data);
        guard.commit().unwrap();
        pid
    };

    let dm = DiskManager::open(&path, PAGE_SIZE).unwrap();
    assert_eq!(dm.page_count(), 1);
    let pool = BufferPoolManager::new(4, dm);
    let guard = pool.fetch_page_read(pid).unwrap();
    assert_eq!(&guard.as_slice()[..data.len()], data);
}

/// Allocation after a reopen continues past every earlier page.
#[test]
fn test_allocation_continues_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nodes.idx");

    {
        let pool = BufferPoolManager::new(4, DiskManager::create(&path, PAGE_SIZE).unwrap());
        for _ in 0..3 {
            pool.allocate_page_id().unwrap();
        }
    }

    let pool = BufferPoolManager::new(4, DiskManager::open(&path, PAGE_SIZE).unwrap());
    assert_eq!(pool.allocate_page_id().unwrap(), PageId::new(3));
    assert_eq!(pool.new_page().unwrap().page_id(), PageId::new(4));
}

/// Concurrent writers to different pages.
#[test]
fn test_concurrent_writers() {
    let (pool, _dir) = create_pool(8);
    let pool = Arc::new(pool);

    let page_ids: Vec<PageId> = (0..5).map(|_| pool.new_page().unwrap().page_id()).collect();

    let handles: Vec<_> = page_ids
        .iter()
        .enumerate()
        .map(|(i, &pid)| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for j in 0..40 {
                    let mut guard = pool.fetch_page_write(pid).unwrap();
                    guard.as_mut_slice()[0] = ((i * 40 + j) % 256) as u8;
                    if j % 10 == 9 {
                        guard.commit().unwrap();
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = pool.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[0], ((i * 40 + 39) % 256) as u8);
    }
}

#[test]
fn test_stats_track_hits_and_evictions() {
    let (pool, _dir) = create_pool(2);

    let pid = pool.new_page().unwrap().page_id();
    for _ in 0..5 {
        let _ = pool.fetch_page_read(pid).unwrap();
    }
    assert!(pool.stats().snapshot().cache_hits >= 5);

    let _ = pool.new_page().unwrap();
    let _ = pool.new_page().unwrap();

    let stats = pool.stats().snapshot();
    assert!(stats.evictions >= 1);
    assert_eq!(pool.disk_page_count(), 3);
}
