//! Disk store
//!
//! Single backing file paged at a fixed stride, with Metadata in page 0.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::block::{AnyBlock, Block, PageId};
use crate::error::{DbError, Result};
use crate::metadata::{self, Metadata};

use super::Store;

/// Byte offset of the Metadata page
const METADATA_POS: u64 = 0;

/// Block storage in a single disk file
///
/// Every insert and update writes exactly one page. Bytes past a block's
/// encoded size are left as whatever the scratch page last held; readers rely
/// on each block's own size header instead.
#[derive(Debug)]
pub struct DiskStore {
    /// Path of the backing file
    path: PathBuf,
    /// Backing file, opened read/write
    file: File,
    /// Page stride in bytes
    page_size: usize,
    /// In-memory Metadata, written back on persist
    meta: Metadata,
    /// Scratch page reused for every read and write
    page: Vec<u8>,
}

impl DiskStore {
    /// Open the store at `path`, or create it if no file exists
    ///
    /// An existing file has its Metadata read from page 0; a new file starts
    /// with empty Metadata and nothing on disk until the first write.
    pub fn open(path: &Path, page_size: usize) -> Result<Self> {
        if page_size < metadata::HEADER_SIZE {
            return Err(DbError::Config(format!(
                "page size {} is smaller than the metadata header",
                page_size
            )));
        }

        let mut page = vec![0u8; page_size];

        let (file, meta) = if path.exists() {
            let mut file = OpenOptions::new().read(true).write(true).open(path)?;
            let len = (file.metadata()?.len() as usize).min(page_size);

            let meta = if len == 0 {
                Metadata::new()
            } else {
                file.seek(SeekFrom::Start(METADATA_POS))?;
                file.read_exact(&mut page[..len])?;
                Metadata::read(&page[..len])?
            };
            (file, meta)
        } else {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            (file, Metadata::new())
        };

        info!(
            path = %path.display(),
            page_size,
            pages = meta.page_count(),
            "opened disk store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            page_size,
            meta,
            page,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the page with the given id (page 0 holds Metadata)
    pub fn position(&self, id: PageId) -> u64 {
        (id as u64 + 1) * self.page_size as u64
    }

    /// Write Metadata and fsync the backing file
    pub fn flush(&mut self) -> Result<()> {
        self.persist()
    }

    /// Flush and close the store
    pub fn close(mut self) -> Result<()> {
        self.persist()
    }

    /// Write the scratch page at the given byte offset
    fn write_page_at(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.write_all(&self.page)?;
        Ok(())
    }
}

impl Store for DiskStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn insert(&mut self, block: AnyBlock) -> Result<PageId> {
        // encode before allocating so an oversized block leaks no id
        block.write(&mut self.page)?;
        let id = self.meta.register(block.kind())?;
        self.write_page_at(self.position(id))?;
        Ok(id)
    }

    fn update(&mut self, id: PageId, block: AnyBlock) -> Result<()> {
        let (kind, _) = self.meta.lookup(id)?;
        if kind != block.kind() {
            return Err(DbError::TypeMismatch {
                id,
                expected: kind,
                found: block.kind(),
            });
        }
        block.write(&mut self.page)?;
        self.write_page_at(self.position(id))
    }

    fn get_block(&mut self, id: PageId) -> Result<AnyBlock> {
        let (kind, _) = self.meta.lookup(id)?;
        let pos = self.position(id);
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.read_exact(&mut self.page)?;
        AnyBlock::read(kind, &self.page)
    }

    fn meta(&self) -> &Metadata {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    fn persist(&mut self) -> Result<()> {
        self.meta.write(&mut self.page)?;
        self.write_page_at(METADATA_POS)?;
        self.file.sync_all()?;
        debug!(path = %self.path.display(), pages = self.meta.page_count(), "persisted metadata");
        Ok(())
    }
}
