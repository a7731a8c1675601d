//! Head Pointer and the meta page that persists it.
//!
//! Page 0 of the node file names the root node and records the geometry the
//! file was created with, so a reopen can refuse a configuration that would
//! misread every node.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::buffer::BufferPoolManager;
use crate::common::config::{DuplicatePolicy, IndexConfig, PAGE_ALIGN};
use crate::common::{Error, NodeId, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

/// Identifies a blobindex node file.
pub const MAGIC: [u8; 8] = *b"BLOBIDX\0";

/// Current meta page format.
pub const FORMAT_VERSION: u32 = 1;

/// Meta flag: a bulk load ran to completion.
pub const FLAG_BUILT: u32 = 1;

/// The root of the tree and a counter of structural changes.
///
/// `generation` starts at 1 with the initial root and grows by one for every
/// node a split or root promotion allocates, so it always equals the number
/// of nodes in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadPointer {
    pub root: NodeId,
    pub generation: u64,
}

/// Geometry recorded in the meta page.
///
/// The duplicate policy is part of it: a tree built under
/// `DuplicatePolicy::Append` may hold equal keys, which the other policies
/// never expect to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub page_size: usize,
    pub order: usize,
    pub key_max_len: usize,
    pub duplicate_policy: DuplicatePolicy,
}

impl Geometry {
    pub fn from_config(config: &IndexConfig) -> Self {
        Self {
            page_size: config.node_page_size(),
            order: config.order,
            key_max_len: config.key_max_len,
            duplicate_policy: config.duplicate_policy,
        }
    }

    /// Check a configuration against the geometry found on disk.
    ///
    /// # Errors
    /// `Error::ConfigMismatch` naming the first field that differs.
    pub fn check(&self, config: &IndexConfig) -> Result<()> {
        let configured = Self::from_config(config);
        let fields = [
            ("order", self.order, configured.order),
            ("key_max_len", self.key_max_len, configured.key_max_len),
            ("page_size", self.page_size, configured.page_size),
            (
                "duplicate_policy",
                self.duplicate_policy.to_raw() as usize,
                configured.duplicate_policy.to_raw() as usize,
            ),
        ];
        for (field, stored, configured) in fields {
            if stored != configured {
                return Err(Error::ConfigMismatch {
                    field,
                    stored: stored as u64,
                    configured: configured as u64,
                });
            }
        }
        Ok(())
    }
}

/// Contents of page 0.
///
/// # Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       5     page header (type = Meta)
/// 5       8     magic "BLOBIDX\0"
/// 13      4     format version
/// 17      4     page size
/// 21      4     order
/// 25      4     key max length
/// 29      4     root node id
/// 33      8     generation
/// 41      4     flags
/// 45      4     duplicate policy (0 overwrite, 1 reject, 2 append)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaPage {
    pub geometry: Geometry,
    pub head: HeadPointer,
    pub flags: u32,
}

impl MetaPage {
    const OFFSET_MAGIC: usize = PageHeader::SIZE;
    const OFFSET_VERSION: usize = 13;
    const OFFSET_PAGE_SIZE: usize = 17;
    const OFFSET_ORDER: usize = 21;
    const OFFSET_KEY_MAX_LEN: usize = 25;
    const OFFSET_ROOT: usize = 29;
    const OFFSET_GENERATION: usize = 33;
    const OFFSET_FLAGS: usize = 41;
    const OFFSET_DUPLICATE_POLICY: usize = 45;

    /// Bytes of the meta page that carry fields.
    pub const FIELDS_SIZE: usize = 49;

    pub fn new(geometry: Geometry, root: NodeId) -> Self {
        Self {
            geometry,
            head: HeadPointer {
                root,
                generation: 1,
            },
            flags: 0,
        }
    }

    pub fn is_built(&self) -> bool {
        self.flags & FLAG_BUILT != 0
    }

    pub fn encode(&self, page: &mut Page) {
        page.reset();
        page.set_header(&PageHeader::new(PageType::Meta));
        page.as_mut_slice()[Self::OFFSET_MAGIC..Self::OFFSET_MAGIC + MAGIC.len()]
            .copy_from_slice(&MAGIC);
        page.write_u32(Self::OFFSET_VERSION, FORMAT_VERSION);
        page.write_u32(Self::OFFSET_PAGE_SIZE, self.geometry.page_size as u32);
        page.write_u32(Self::OFFSET_ORDER, self.geometry.order as u32);
        page.write_u32(Self::OFFSET_KEY_MAX_LEN, self.geometry.key_max_len as u32);
        page.write_u32(Self::OFFSET_ROOT, self.head.root.0);
        page.write_u64(Self::OFFSET_GENERATION, self.head.generation);
        page.write_u32(Self::OFFSET_FLAGS, self.flags);
        page.write_u32(
            Self::OFFSET_DUPLICATE_POLICY,
            self.geometry.duplicate_policy.to_raw(),
        );
        page.update_checksum();
    }

    /// Decode a full meta page, verifying its checksum.
    pub fn decode(page: &Page) -> Result<Self> {
        if page.page_type() != PageType::Meta {
            return Err(corrupted("page 0 is not a meta page"));
        }
        if !page.verify_checksum() {
            return Err(corrupted("meta page checksum mismatch"));
        }
        let geometry = Self::decode_geometry(page.as_slice())?;

        Ok(Self {
            geometry,
            head: HeadPointer {
                root: NodeId::new(page.read_u32(Self::OFFSET_ROOT)),
                generation: page.read_u64(Self::OFFSET_GENERATION),
            },
            flags: page.read_u32(Self::OFFSET_FLAGS),
        })
    }

    /// Read the stored geometry straight from the file.
    ///
    /// The page size is needed before the node file can be opened, so this
    /// reads only the leading fields and cannot verify the checksum.
    pub fn peek<P: AsRef<Path>>(path: P) -> Result<Geometry> {
        let mut buf = [0u8; Self::FIELDS_SIZE];
        let mut file = File::open(path)?;
        file.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => corrupted("file too short for a meta page"),
            _ => Error::Io(e),
        })?;
        if PageType::from_u8(buf[PageHeader::OFFSET_PAGE_TYPE]) != PageType::Meta {
            return Err(corrupted("page 0 is not a meta page"));
        }
        Self::decode_geometry(&buf)
    }

    /// Read the meta page through the node cache.
    pub fn load(pool: &BufferPoolManager) -> Result<Self> {
        let guard = pool.fetch_page_read(PageId::META)?;
        Self::decode(&guard)
    }

    /// Write the meta page through to disk.
    pub fn store(&self, pool: &BufferPoolManager) -> Result<()> {
        let mut guard = pool.fetch_page_write(PageId::META)?;
        self.encode(&mut guard);
        guard.commit()
    }

    fn decode_geometry(data: &[u8]) -> Result<Geometry> {
        let u32_at = |offset: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&data[offset..offset + 4]);
            u32::from_le_bytes(buf)
        };

        if data[Self::OFFSET_MAGIC..Self::OFFSET_MAGIC + MAGIC.len()] != MAGIC {
            return Err(corrupted("bad magic"));
        }
        let version = u32_at(Self::OFFSET_VERSION);
        if version != FORMAT_VERSION {
            return Err(corrupted(&format!("unsupported format version {}", version)));
        }

        let page_size = u32_at(Self::OFFSET_PAGE_SIZE) as usize;
        if page_size == 0 || page_size % PAGE_ALIGN != 0 {
            return Err(corrupted(&format!("invalid page size {}", page_size)));
        }

        let policy = u32_at(Self::OFFSET_DUPLICATE_POLICY);
        let duplicate_policy = DuplicatePolicy::from_raw(policy)
            .ok_or_else(|| corrupted(&format!("unknown duplicate policy {}", policy)))?;

        Ok(Geometry {
            page_size,
            order: u32_at(Self::OFFSET_ORDER) as usize,
            key_max_len: u32_at(Self::OFFSET_KEY_MAX_LEN) as usize,
            duplicate_policy,
        })
    }
}

fn corrupted(reason: &str) -> Error {
    Error::Corrupted {
        page: PageId::META.0,
        reason: reason.to_string(),
    }
}
