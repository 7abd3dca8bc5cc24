//! Metadata block
//!
//! Per-store ledger of the B+Tree root and every allocated page id, grouped by
//! block kind.
//!
//! ## Page Format
//! ```text
//! ┌──────────────┬───────────────┬────────────────┬──────────────┬───────────────┐
//! │ Root (2)     │ N Data (2)    │ N BTree (2)    │ Data ids     │ BTree ids     │
//! │ PageId       │ u16           │ u16            │ N Data × 2   │ N BTree × 2   │
//! └──────────────┴───────────────┴────────────────┴──────────────┴───────────────┘
//! ```
//!
//! Page ids are handed out densely: the next id is always the total number of
//! ids already tracked, so every id list stays in ascending order and lookups
//! can binary search.

use bytes::{Buf, BufMut};

use crate::block::{ensure_fits, ensure_readable, Block, BlockKind, PageId, BLOCK_NULL};
use crate::error::{DbError, Result};

/// Header size: Root (2) + N Data (2) + N BTree (2) = 6 bytes
pub const HEADER_SIZE: usize = 6;

/// Size of one encoded page id
const ID_SIZE: usize = std::mem::size_of::<PageId>();

/// Store metadata: B+Tree root and allocated page ids by kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Page id of the B+Tree root, or BLOCK_NULL when the tree is empty
    pub root_id: PageId,
    /// Data block ids in allocation order
    pub data_ids: Vec<PageId>,
    /// B+Tree node ids in allocation order
    pub btree_ids: Vec<PageId>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            root_id: BLOCK_NULL,
            data_ids: Vec::new(),
            btree_ids: Vec::new(),
        }
    }
}

impl Metadata {
    /// Create empty metadata with no root
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocated ids for the given kind
    ///
    /// Metadata blocks are not tracked in their own ledger.
    pub fn ids(&self, kind: BlockKind) -> Result<&[PageId]> {
        match kind {
            BlockKind::Data => Ok(&self.data_ids),
            BlockKind::BTreeNode => Ok(&self.btree_ids),
            BlockKind::Metadata => Err(DbError::UnsupportedBlockKind(kind)),
        }
    }

    /// Mutable allocated ids for the given kind
    pub fn ids_mut(&mut self, kind: BlockKind) -> Result<&mut Vec<PageId>> {
        match kind {
            BlockKind::Data => Ok(&mut self.data_ids),
            BlockKind::BTreeNode => Ok(&mut self.btree_ids),
            BlockKind::Metadata => Err(DbError::UnsupportedBlockKind(kind)),
        }
    }

    /// Find the kind of an allocated page and its position in that kind's list
    pub fn lookup(&self, id: PageId) -> Result<(BlockKind, usize)> {
        if let Ok(pos) = self.data_ids.binary_search(&id) {
            return Ok((BlockKind::Data, pos));
        }
        if let Ok(pos) = self.btree_ids.binary_search(&id) {
            return Ok((BlockKind::BTreeNode, pos));
        }
        Err(DbError::UnknownBlockId(id))
    }

    /// Whether the given page id has been allocated
    pub fn contains(&self, id: PageId) -> bool {
        self.lookup(id).is_ok()
    }

    /// Next unused page id: the total number of ids tracked so far
    pub fn new_id(&self) -> Result<PageId> {
        let next = self.data_ids.len() + self.btree_ids.len();
        // BLOCK_NULL is reserved, so the last usable id is BLOCK_NULL - 1
        if next >= BLOCK_NULL as usize {
            return Err(DbError::PageIdsExhausted);
        }
        Ok(next as PageId)
    }

    /// Allocate a fresh page id and record it under the given kind
    pub fn register(&mut self, kind: BlockKind) -> Result<PageId> {
        let id = self.new_id()?;
        self.ids_mut(kind)?.push(id);
        tracing::trace!(id, %kind, "allocated page id");
        Ok(id)
    }

    /// Total number of allocated pages across all kinds
    pub fn page_count(&self) -> usize {
        self.data_ids.len() + self.btree_ids.len()
    }

    /// Size of this metadata once encoded
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.page_count() * ID_SIZE
    }
}

impl Block for Metadata {
    const KIND: BlockKind = BlockKind::Metadata;

    fn read(page: &[u8]) -> Result<Self> {
        ensure_readable(Self::KIND, HEADER_SIZE, page)?;

        let mut buf = page;
        let root_id = buf.get_u16_le();
        let n_data = buf.get_u16_le() as usize;
        let n_btree = buf.get_u16_le() as usize;

        ensure_readable(Self::KIND, HEADER_SIZE + (n_data + n_btree) * ID_SIZE, page)?;

        let data_ids: Vec<PageId> = (0..n_data).map(|_| buf.get_u16_le()).collect();
        let btree_ids: Vec<PageId> = (0..n_btree).map(|_| buf.get_u16_le()).collect();

        for ids in [&data_ids, &btree_ids] {
            if !ids.windows(2).all(|pair| pair[0] < pair[1]) {
                return Err(DbError::Corrupted(
                    "metadata page ids are not strictly ascending".to_string(),
                ));
            }
        }

        Ok(Self {
            root_id,
            data_ids,
            btree_ids,
        })
    }

    fn write(&self, page: &mut [u8]) -> Result<usize> {
        let len = self.encoded_len();
        ensure_fits(Self::KIND, len, page)?;

        let mut buf = &mut page[..len];
        buf.put_u16_le(self.root_id);
        buf.put_u16_le(self.data_ids.len() as u16);
        buf.put_u16_le(self.btree_ids.len() as u16);
        for id in self.data_ids.iter().chain(&self.btree_ids) {
            buf.put_u16_le(*id);
        }

        Ok(len)
    }
}
