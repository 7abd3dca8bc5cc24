//! Store Module
//!
//! Page-id-indexed persistence of blocks.
//!
//! ## Responsibilities
//! - Allocate page ids through the store's Metadata, tagged by block kind
//! - Persist blocks at their page ids and hand back detached copies
//! - Flush Metadata on explicit `persist()`
//!
//! ## Disk Layout
//! ```text
//! ┌────────────────────┬────────────────────┬────────────────────┬─────
//! │ Page 0: Metadata   │ Page id 0          │ Page id 1          │ ...
//! │ offset 0           │ offset PAGE_SIZE   │ offset 2×PAGE_SIZE │
//! └────────────────────┴────────────────────┴────────────────────┴─────
//! ```
//!
//! ## Concurrency
//! None. Allocation and page writes are not atomic with respect to each other;
//! callers sharing a store must serialize access themselves.

mod disk;
mod mem;
mod spy;

pub use disk::DiskStore;
pub use mem::MemStore;
pub use spy::{SpyOp, SpyStore};

use crate::block::{AnyBlock, BlockKind, PageId, StoredBlock};
use crate::error::{DbError, Result};
use crate::metadata::Metadata;

/// Page-id-indexed block storage
///
/// Every store owns exactly one Metadata instance. Inserts mutate it in memory
/// only; `persist()` writes it to the backing medium.
pub trait Store {
    /// Size in bytes of every page in this store
    fn page_size(&self) -> usize;

    /// Allocate a fresh page id for the block and persist it there
    fn insert(&mut self, block: AnyBlock) -> Result<PageId>;

    /// Overwrite the page at `id`
    ///
    /// The stored kind cannot change: an update with a block of another kind
    /// fails with `TypeMismatch`.
    fn update(&mut self, id: PageId, block: AnyBlock) -> Result<()>;

    /// Read the block at `id` as a detached copy
    fn get_block(&mut self, id: PageId) -> Result<AnyBlock>;

    /// Metadata of this store
    fn meta(&self) -> &Metadata;

    /// Mutable Metadata of this store
    fn meta_mut(&mut self) -> &mut Metadata;

    /// Replace the Metadata of this store
    fn set_meta(&mut self, meta: Metadata) {
        *self.meta_mut() = meta;
    }

    /// Write Metadata (and any buffered pages) to the backing medium
    fn persist(&mut self) -> Result<()>;

    /// Read the block at `id`, failing unless it is a `T`
    fn get<T: StoredBlock>(&mut self, id: PageId) -> Result<T>
    where
        Self: Sized,
    {
        let block = self.get_block(id)?;
        T::from_any(block).map_err(|other| DbError::TypeMismatch {
            id,
            expected: T::KIND,
            found: other.kind(),
        })
    }

    /// Allocated page ids of the given kind
    fn kind_ids(&self, kind: BlockKind) -> Result<Vec<PageId>> {
        Ok(self.meta().ids(kind)?.to_vec())
    }
}

/// Fail unless the block fits in one page of the given size
pub(crate) fn ensure_block_fits(block: &AnyBlock, page_size: usize) -> Result<()> {
    let needed = block.encoded_len();
    if needed > page_size {
        return Err(DbError::PageOverflow {
            kind: block.kind(),
            needed,
            page_size,
        });
    }
    Ok(())
}
