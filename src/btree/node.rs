//! B+Tree node block
//!
//! Fixed-capacity page of sorted keys and page id pointers.

use bytes::{Buf, BufMut};

use crate::block::{ensure_fits, ensure_readable, Block, BlockKind, Key, PageId, BLOCK_NULL};
use crate::error::{DbError, Result};

/// Header size: one u16 packing kind (msb) and key count (low 15 bits)
pub const HEADER_SIZE: usize = 2;

/// Bit of the header word holding the node kind
const HEADER_KIND_BIT: u16 = 15;

/// Mask selecting the key count from the header word
const HEADER_COUNT_MASK: u16 = !(1 << HEADER_KIND_BIT);

const KEY_SIZE: usize = std::mem::size_of::<Key>();
const POINTER_SIZE: usize = std::mem::size_of::<PageId>();

/// Leaf or internal node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NodeKind {
    /// Routes to child nodes: pointer[i] < keys[i] <= pointer[i+1]
    Internal = 0,
    /// Holds payload pointers: pointer[i] pairs with keys[i], last pointer
    /// links to the next leaf
    Leaf = 1,
}

/// A B+Tree node
///
/// Holds up to `capacity` keys in ascending order. A leaf always carries
/// `keys.len() + 1` pointers, the last being its next-leaf link; an internal
/// node does once its first child is inserted.
#[derive(Debug, Clone)]
pub struct BTreeNode {
    pub(crate) kind: NodeKind,
    pub(crate) capacity: u16,
    pub(crate) keys: Vec<Key>,
    pub(crate) pointers: Vec<PageId>,
}

impl BTreeNode {
    /// Create an empty node of the given kind and key capacity
    ///
    /// Leaves start with a BLOCK_NULL next-leaf link, matching how an empty
    /// leaf is encoded.
    pub fn new(kind: NodeKind, capacity: u16) -> Self {
        let pointers = match kind {
            NodeKind::Leaf => vec![BLOCK_NULL],
            NodeKind::Internal => Vec::new(),
        };
        Self {
            kind,
            capacity,
            keys: Vec::new(),
            pointers,
        }
    }

    /// Create an empty leaf node
    pub fn leaf(capacity: u16) -> Self {
        Self::new(NodeKind::Leaf, capacity)
    }

    /// Create an empty internal node
    pub fn internal(capacity: u16) -> Self {
        Self::new(NodeKind::Internal, capacity)
    }

    /// Key capacity of a node filling one page
    ///
    /// Leaves room for `capacity` keys, `capacity + 1` pointers and the header.
    pub fn capacity_for(page_size: usize) -> u16 {
        let capacity = page_size.saturating_sub(HEADER_SIZE + POINTER_SIZE) / (KEY_SIZE + POINTER_SIZE);
        capacity.min(HEADER_COUNT_MASK as usize) as u16
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn pointers(&self) -> &[PageId] {
        &self.pointers
    }

    /// Number of keys held
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.keys.len() >= self.capacity as usize
    }

    /// Trailing pointer of a leaf, linking to the next leaf
    ///
    /// `None` if this is not a leaf or the pointer count is malformed.
    pub fn next_leaf(&self) -> Option<PageId> {
        if !self.is_leaf() || self.pointers.len() != self.keys.len() + 1 {
            return None;
        }
        self.pointers.last().copied()
    }

    /// Point this leaf's trailing pointer at the next leaf
    pub fn set_next_leaf(&mut self, next: PageId) -> Result<()> {
        if !self.is_leaf() {
            return Err(DbError::MalformedNode(
                "only leaf nodes link to a next leaf".to_string(),
            ));
        }
        match self.pointers.last_mut() {
            Some(last) => {
                *last = next;
                Ok(())
            }
            None => Err(DbError::MalformedNode(
                "leaf has no trailing pointer to link".to_string(),
            )),
        }
    }

    /// Pointer to follow for the given key in an internal node
    ///
    /// Exact matches go right, consistent with leaves placing equal keys
    /// after existing ones.
    pub fn child_for(&self, key: Key) -> Option<PageId> {
        let index = self.keys.partition_point(|k| *k <= key);
        self.pointers.get(index).copied()
    }

    /// Insert a key and its pointer, keeping keys sorted
    ///
    /// Equal keys are placed after existing ones. Splitting is the tree's job:
    /// a full node rejects the insert.
    pub fn insert(&mut self, key: Key, pointer: PageId) -> Result<()> {
        if self.is_full() {
            return Err(DbError::CapacityExceeded {
                kind: BlockKind::BTreeNode,
                capacity: self.capacity as usize,
            });
        }

        let index = self.keys.partition_point(|k| *k <= key);
        match self.kind {
            NodeKind::Leaf => {
                if self.pointers.is_empty() {
                    // trailing next-leaf link
                    self.pointers.push(BLOCK_NULL);
                }
                self.keys.insert(index, key);
                self.pointers.insert(index, pointer);
            }
            NodeKind::Internal => {
                if self.pointers.is_empty() {
                    // the first child has no separator key
                    self.pointers.push(pointer);
                    return Ok(());
                }
                self.keys.insert(index, key);
                self.pointers.insert(index + 1, pointer);
            }
        }
        Ok(())
    }

    /// Size of this node once encoded
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.keys.len() * KEY_SIZE + (self.keys.len() + 1) * POINTER_SIZE
    }
}

impl PartialEq for BTreeNode {
    /// Compares stored contents; capacity is derived from the page on read
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.keys == other.keys && self.pointers == other.pointers
    }
}

impl Eq for BTreeNode {}

impl Block for BTreeNode {
    const KIND: BlockKind = BlockKind::BTreeNode;

    fn read(page: &[u8]) -> Result<Self> {
        ensure_readable(Self::KIND, HEADER_SIZE, page)?;

        let mut buf = page;
        let header = buf.get_u16_le();
        let kind = if header >> HEADER_KIND_BIT == 1 {
            NodeKind::Leaf
        } else {
            NodeKind::Internal
        };
        let count = (header & HEADER_COUNT_MASK) as usize;

        ensure_readable(
            Self::KIND,
            HEADER_SIZE + count * KEY_SIZE + (count + 1) * POINTER_SIZE,
            page,
        )?;

        let keys = (0..count).map(|_| buf.get_u16_le()).collect();
        let pointers = (0..count + 1).map(|_| buf.get_u16_le()).collect();

        Ok(Self {
            kind,
            capacity: Self::capacity_for(page.len()),
            keys,
            pointers,
        })
    }

    fn write(&self, page: &mut [u8]) -> Result<usize> {
        let count = self.keys.len();
        let pointers_ok = self.pointers.len() == count + 1 || (count == 0 && self.pointers.is_empty());
        if !pointers_ok || count > HEADER_COUNT_MASK as usize {
            return Err(DbError::MalformedNode(format!(
                "cannot encode {} keys with {} pointers",
                count,
                self.pointers.len()
            )));
        }

        let len = self.encoded_len();
        ensure_fits(Self::KIND, len, page)?;

        let mut buf = &mut page[..len];
        buf.put_u16_le(((self.kind as u16) << HEADER_KIND_BIT) | count as u16);
        for key in &self.keys {
            buf.put_u16_le(*key);
        }
        if self.pointers.is_empty() {
            buf.put_u16_le(BLOCK_NULL);
        }
        for pointer in &self.pointers {
            buf.put_u16_le(*pointer);
        }

        Ok(len)
    }
}
