//! In-memory store
//!
//! Blocks held by value in a vector indexed by page id.

use crate::block::{AnyBlock, PageId, DEFAULT_PAGE_SIZE};
use crate::error::{DbError, Result};
use crate::metadata::Metadata;

use super::{ensure_block_fits, Store};

/// In-process block storage
///
/// Blocks are cloned on the way in and on the way out, so retrieved blocks
/// never alias stored ones.
#[derive(Debug, Clone)]
pub struct MemStore {
    /// Blocks by page id; `None` for ids allocated elsewhere
    blocks: Vec<Option<AnyBlock>>,
    meta: Metadata,
    page_size: usize,
}

impl MemStore {
    /// Create an empty store with the given page size
    pub fn new(page_size: usize) -> Self {
        Self {
            blocks: Vec::new(),
            meta: Metadata::new(),
            page_size,
        }
    }

    /// Number of pages holding a block
    pub fn len(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&mut self, id: PageId) -> &mut Option<AnyBlock> {
        let index = id as usize;
        if index >= self.blocks.len() {
            self.blocks.resize(index + 1, None);
        }
        &mut self.blocks[index]
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Store for MemStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn insert(&mut self, block: AnyBlock) -> Result<PageId> {
        ensure_block_fits(&block, self.page_size)?;
        let id = self.meta.register(block.kind())?;
        *self.slot(id) = Some(block);
        Ok(id)
    }

    fn update(&mut self, id: PageId, block: AnyBlock) -> Result<()> {
        ensure_block_fits(&block, self.page_size)?;
        let slot = self
            .blocks
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(DbError::NotFound(id))?;

        if slot.kind() != block.kind() {
            return Err(DbError::TypeMismatch {
                id,
                expected: slot.kind(),
                found: block.kind(),
            });
        }
        *slot = block;
        Ok(())
    }

    fn get_block(&mut self, id: PageId) -> Result<AnyBlock> {
        self.blocks
            .get(id as usize)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or(DbError::NotFound(id))
    }

    fn meta(&self) -> &Metadata {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    fn persist(&mut self) -> Result<()> {
        // nothing backs this store
        Ok(())
    }
}
