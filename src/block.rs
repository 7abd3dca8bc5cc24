//! Block Module
//!
//! The fixed-size page abstraction shared by every on-disk structure.
//!
//! ## Block Kinds
//! ```text
//! ┌──────────────┬───────────────────────────────────────────────┐
//! │ Kind         │ Contents                                      │
//! ├──────────────┼───────────────────────────────────────────────┤
//! │ Data         │ Columnar records sharing one key + chain link │
//! │ BTreeNode    │ Sorted keys + page id pointers                │
//! │ Metadata     │ Root pointer + allocated page ids per kind    │
//! └──────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! The kind of a page is never inferred from its bytes: stores look it up in
//! the Metadata ledger before decoding, and every in-memory block carries it
//! in its type.

use std::fmt;

use crate::btree::BTreeNode;
use crate::data::Data;
use crate::error::{DbError, Result};

// =============================================================================
// Identifiers
// =============================================================================

/// Identifies a fixed-size page within a store
pub type PageId = u16;

/// Sentinel page id meaning "no page"
pub const BLOCK_NULL: PageId = PageId::MAX;

/// Sort key indexed by the B+Tree
pub type Key = u16;

/// Largest representable key, reported by empty data blocks
pub const KEY_MAX: Key = Key::MAX;

/// Identifies a record within a single data block
pub type RecordId = u16;

/// Default page size in bytes
pub const DEFAULT_PAGE_SIZE: usize = 4096;

// =============================================================================
// Block Kind
// =============================================================================

/// Discriminates the page formats a store can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    Data = 0,
    BTreeNode = 1,
    Metadata = 2,
}

impl BlockKind {
    /// Number of block kinds
    pub const COUNT: usize = 3;

    /// Every block kind, in discriminant order
    pub const ALL: [BlockKind; Self::COUNT] =
        [BlockKind::Data, BlockKind::BTreeNode, BlockKind::Metadata];
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Data => "Data",
            BlockKind::BTreeNode => "BTreeNode",
            BlockKind::Metadata => "Metadata",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Block Capability
// =============================================================================

/// Anything that serializes to and from one fixed-size page
///
/// `read` receives exactly one page; bytes past the block's own size header are
/// ignored. `write` returns the number of bytes written and leaves the rest of
/// the page untouched.
pub trait Block: Sized {
    /// Kind tag of this block type
    const KIND: BlockKind;

    /// Kind tag of this block
    fn kind(&self) -> BlockKind {
        Self::KIND
    }

    /// Decode a block from a page
    fn read(page: &[u8]) -> Result<Self>;

    /// Encode this block into a page
    fn write(&self, page: &mut [u8]) -> Result<usize>;
}

/// Blocks that stores hold at allocated page ids (everything but Metadata)
pub trait StoredBlock: Block + Into<AnyBlock> {
    /// Unwrap a block of this type, handing the block back on a kind mismatch
    fn from_any(block: AnyBlock) -> std::result::Result<Self, AnyBlock>;
}

/// A block retrieved from a store
///
/// Always a detached copy: mutating it has no effect on the store until it is
/// written back with `Store::update`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyBlock {
    Data(Data),
    Node(BTreeNode),
}

impl AnyBlock {
    /// Kind tag of the wrapped block
    pub fn kind(&self) -> BlockKind {
        match self {
            AnyBlock::Data(_) => BlockKind::Data,
            AnyBlock::Node(_) => BlockKind::BTreeNode,
        }
    }

    /// Decode a page whose kind is already known
    pub fn read(kind: BlockKind, page: &[u8]) -> Result<Self> {
        match kind {
            BlockKind::Data => Ok(AnyBlock::Data(Data::read(page)?)),
            BlockKind::BTreeNode => Ok(AnyBlock::Node(BTreeNode::read(page)?)),
            BlockKind::Metadata => Err(DbError::UnsupportedBlockKind(kind)),
        }
    }

    /// Encode the wrapped block into a page
    pub fn write(&self, page: &mut [u8]) -> Result<usize> {
        match self {
            AnyBlock::Data(data) => data.write(page),
            AnyBlock::Node(node) => node.write(page),
        }
    }

    /// Size of the wrapped block once encoded
    pub fn encoded_len(&self) -> usize {
        match self {
            AnyBlock::Data(data) => data.encoded_len(),
            AnyBlock::Node(node) => node.encoded_len(),
        }
    }
}

impl From<Data> for AnyBlock {
    fn from(data: Data) -> Self {
        AnyBlock::Data(data)
    }
}

impl From<BTreeNode> for AnyBlock {
    fn from(node: BTreeNode) -> Self {
        AnyBlock::Node(node)
    }
}

impl StoredBlock for Data {
    fn from_any(block: AnyBlock) -> std::result::Result<Self, AnyBlock> {
        match block {
            AnyBlock::Data(data) => Ok(data),
            other => Err(other),
        }
    }
}

impl StoredBlock for BTreeNode {
    fn from_any(block: AnyBlock) -> std::result::Result<Self, AnyBlock> {
        match block {
            AnyBlock::Node(node) => Ok(node),
            other => Err(other),
        }
    }
}

// =============================================================================
// Page Bounds Helpers
// =============================================================================

/// Fail unless an encoding of `needed` bytes fits in `page`
pub(crate) fn ensure_fits(kind: BlockKind, needed: usize, page: &[u8]) -> Result<()> {
    if needed > page.len() {
        return Err(DbError::PageOverflow {
            kind,
            needed,
            page_size: page.len(),
        });
    }
    Ok(())
}

/// Fail unless `page` holds the `needed` bytes its header claims
pub(crate) fn ensure_readable(kind: BlockKind, needed: usize, page: &[u8]) -> Result<()> {
    if needed > page.len() {
        return Err(DbError::Corrupted(format!(
            "{} page claims {} bytes but only {} are available",
            kind,
            needed,
            page.len()
        )));
    }
    Ok(())
}
