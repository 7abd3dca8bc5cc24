//! B+Tree index
//!
//! Bulk-loaded B+Tree over a Store. All node contents live in store pages;
//! the root page id in the store's Metadata is the only other tree state.

use std::collections::BTreeMap;

use tracing::debug;

use crate::block::{Key, PageId, BLOCK_NULL};
use crate::error::{DbError, Result};
use crate::store::Store;

use super::node::BTreeNode;

/// B+Tree index borrowing a store for its nodes
pub struct BTree<'a, S: Store> {
    /// Key capacity of every node built by this tree
    capacity: u16,
    /// Store holding the tree's nodes and root pointer
    store: &'a mut S,
}

impl<'a, S: Store> BTree<'a, S> {
    /// Attach a tree to the store, with nodes sized to fill one page
    pub fn new(store: &'a mut S) -> Result<Self> {
        let capacity = BTreeNode::capacity_for(store.page_size());
        Self::with_capacity(store, capacity)
    }

    /// Attach a tree to the store, building nodes of the given key capacity
    pub fn with_capacity(store: &'a mut S, capacity: u16) -> Result<Self> {
        if capacity == 0 {
            return Err(DbError::Config(
                "B+Tree nodes must hold at least one key".to_string(),
            ));
        }
        Ok(Self { capacity, store })
    }

    /// Key capacity of nodes built by this tree
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Page id of the root node, or BLOCK_NULL if the tree is empty
    pub fn root(&self) -> PageId {
        self.store.meta().root_id
    }

    /// Point the store's Metadata at a new root
    pub fn set_root(&mut self, id: PageId) {
        self.store.meta_mut().root_id = id;
    }

    pub fn is_empty(&self) -> bool {
        self.root() == BLOCK_NULL
    }

    pub fn store(&self) -> &S {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut *self.store
    }

    // =========================================================================
    // Bulk Loading
    // =========================================================================

    /// Pack sorted key pointer pairs into a chain of leaf nodes
    ///
    /// Returns the first key of each leaf mapped to that leaf's page id, to
    /// be propagated to the level above.
    pub fn load_leaf(&mut self, key_pointers: &BTreeMap<Key, PageId>) -> Result<BTreeMap<Key, PageId>> {
        if key_pointers.is_empty() {
            return Err(DbError::EmptyInput);
        }

        let mut propagate = BTreeMap::new();
        // leaf being filled and its page id
        let mut open: Option<(BTreeNode, PageId)> = None;

        for (&key, &pointer) in key_pointers {
            if let Some((leaf, _)) = open.as_mut().filter(|(leaf, _)| !leaf.is_full()) {
                leaf.insert(key, pointer)?;
                continue;
            }

            let mut next = BTreeNode::leaf(self.capacity);
            next.insert(key, pointer)?;
            let next_id = self.store.insert(next.clone().into())?;
            propagate.insert(key, next_id);

            if let Some((mut full, full_id)) = open.take() {
                full.set_next_leaf(next_id)?;
                self.store.update(full_id, full.into())?;
            }
            open = Some((next, next_id));
        }

        // the last leaf keeps its BLOCK_NULL chain pointer
        if let Some((last, last_id)) = open {
            self.store.update(last_id, last.into())?;
        }

        Ok(propagate)
    }

    /// Pack sorted key pointer pairs into internal nodes
    ///
    /// Nodes are split at about half capacity to mimic the fill left behind
    /// by incremental inserts. Returns the first key of each node mapped to
    /// its page id.
    pub fn load_internal(&mut self, key_pointers: &BTreeMap<Key, PageId>) -> Result<BTreeMap<Key, PageId>> {
        if key_pointers.len() < 2 {
            return Err(DbError::InsufficientFanIn(key_pointers.len()));
        }

        let split_at = self.capacity.div_ceil(2) as usize;
        let mut propagate = BTreeMap::new();
        let mut open: Option<(BTreeNode, PageId)> = None;

        for (&key, &pointer) in key_pointers {
            if let Some((node, _)) = open.as_mut().filter(|(node, _)| node.len() < split_at) {
                node.insert(key, pointer)?;
                continue;
            }

            if let Some((full, full_id)) = open.take() {
                self.store.update(full_id, full.into())?;
            }

            // the first child's key is dropped here and propagated upward
            let mut node = BTreeNode::internal(self.capacity);
            node.insert(key, pointer)?;
            let id = self.store.insert(node.clone().into())?;
            propagate.insert(key, id);
            open = Some((node, id));
        }

        if let Some((node, id)) = open {
            self.store.update(id, node.into())?;
        }

        Ok(propagate)
    }

    /// Replace the tree with one built from sorted key pointer pairs
    ///
    /// Returns the number of levels built; an empty input builds nothing and
    /// leaves the root unset.
    pub fn bulk_load(&mut self, key_pointers: &BTreeMap<Key, PageId>) -> Result<usize> {
        if key_pointers.is_empty() {
            return Ok(0);
        }

        let mut propagate = self.load_leaf(key_pointers)?;
        let mut levels = 1;
        debug!(level = levels, nodes = propagate.len(), "built leaf level");

        while propagate.len() > 1 {
            propagate = self.load_internal(&propagate)?;
            levels += 1;
            debug!(level = levels, nodes = propagate.len(), "built internal level");
        }

        let root = propagate
            .values()
            .next()
            .copied()
            .ok_or_else(|| DbError::MalformedNode("no root propagated".to_string()))?;
        self.set_root(root);

        debug!(levels, root, keys = key_pointers.len(), "bulk load complete");
        Ok(levels)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Find the leaf that may hold the given key
    ///
    /// Returns `None` for an empty tree.
    pub fn lookup(&mut self, key: Key) -> Result<Option<BTreeNode>> {
        if self.is_empty() {
            return Ok(None);
        }

        let root = self.root();
        let mut node: BTreeNode = self.store.get(root)?;
        while !node.is_leaf() {
            let next = node.child_for(key).ok_or_else(|| {
                DbError::MalformedNode("internal node has no child pointers".to_string())
            })?;
            node = self.store.get(next)?;
        }
        Ok(Some(node))
    }

    /// Pointer stored for exactly this key, or BLOCK_NULL if absent
    pub fn get(&mut self, key: Key) -> Result<PageId> {
        let Some(leaf) = self.lookup(key)? else {
            return Ok(BLOCK_NULL);
        };
        match leaf.keys.binary_search(&key) {
            Ok(index) => leaf.pointers.get(index).copied().ok_or_else(|| {
                DbError::MalformedNode(format!("leaf key {} has no pointer", key))
            }),
            Err(_) => Ok(BLOCK_NULL),
        }
    }

    /// Pointers of all keys in `[begin, end]`, in ascending key order
    pub fn range(&mut self, begin: Key, end: Key) -> Result<Vec<PageId>> {
        let mut pointers = Vec::new();
        if begin > end {
            return Ok(pointers);
        }
        let Some(mut leaf) = self.lookup(begin)? else {
            return Ok(pointers);
        };

        let mut index = leaf.keys.partition_point(|k| *k < begin);
        loop {
            while let Some(&key) = leaf.keys.get(index) {
                if key > end {
                    return Ok(pointers);
                }
                let pointer = leaf.pointers.get(index).copied().ok_or_else(|| {
                    DbError::MalformedNode(format!("leaf key {} has no pointer", key))
                })?;
                pointers.push(pointer);
                index += 1;
            }

            // leaf exhausted: follow the chain
            let next = match leaf.next_leaf() {
                Some(next) => next,
                None if leaf.keys.is_empty() && leaf.pointers.is_empty() => BLOCK_NULL,
                None => {
                    return Err(DbError::MalformedNode(
                        "leaf has keys but no trailing chain pointer".to_string(),
                    ))
                }
            };
            if next == BLOCK_NULL {
                return Ok(pointers);
            }
            leaf = self.store.get(next)?;
            if !leaf.is_leaf() {
                return Err(DbError::MalformedNode(format!(
                    "leaf chain points at internal node {}",
                    next
                )));
            }
            index = 0;
        }
    }
}
