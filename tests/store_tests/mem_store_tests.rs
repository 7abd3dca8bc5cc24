//! Tests for the in-memory store
//!
//! These tests verify:
//! - Dense page id allocation tagged by block kind
//! - Typed retrieval and kind checks
//! - Detached copies on retrieval

use blockdb::{AnyBlock, BlockKind, BTreeNode, Data, DbError, MemStore, Metadata, Store};

// =============================================================================
// Helper Functions
// =============================================================================

fn leaf_with(key: u16) -> BTreeNode {
    let mut node = BTreeNode::leaf(8);
    node.insert(key, key).unwrap();
    node
}

// =============================================================================
// Insert / Get Tests
// =============================================================================

#[test]
fn test_insert_get() {
    let mut store = MemStore::default();
    let data = Data::new(4);
    let node = leaf_with(3);

    let id1 = store.insert(data.clone().into()).unwrap();
    let id2 = store.insert(node.clone().into()).unwrap();
    assert_eq!((id1, id2), (0, 1));
    assert_eq!(store.len(), 2);

    assert_eq!(store.get::<Data>(id1).unwrap(), data);
    assert_eq!(store.get::<BTreeNode>(id2).unwrap(), node);
    assert!(matches!(store.get::<Data>(999), Err(DbError::NotFound(999))));

    assert_eq!(store.kind_ids(BlockKind::Data).unwrap(), vec![0]);
    assert_eq!(store.kind_ids(BlockKind::BTreeNode).unwrap(), vec![1]);
}

#[test]
fn test_get_wrong_kind_fails() {
    let mut store = MemStore::default();
    let id = store.insert(Data::new(4).into()).unwrap();

    assert!(matches!(
        store.get::<BTreeNode>(id),
        Err(DbError::TypeMismatch {
            expected: BlockKind::BTreeNode,
            found: BlockKind::Data,
            ..
        })
    ));
}

#[test]
fn test_update() {
    let mut store = MemStore::default();
    let id = store.insert(leaf_with(3).into()).unwrap();

    store.update(id, leaf_with(5).into()).unwrap();
    assert_eq!(store.get::<BTreeNode>(id).unwrap().keys(), &[5]);

    assert!(matches!(
        store.update(id, Data::new(4).into()),
        Err(DbError::TypeMismatch { .. })
    ));
    assert!(matches!(
        store.update(42, leaf_with(1).into()),
        Err(DbError::NotFound(42))
    ));
}

#[test]
fn test_retrieved_blocks_are_detached() {
    let mut store = MemStore::default();
    let id = store.insert(leaf_with(3).into()).unwrap();

    let mut copy: BTreeNode = store.get(id).unwrap();
    copy.insert(4, 4).unwrap();
    assert_eq!(store.get::<BTreeNode>(id).unwrap().keys(), &[3]);

    store.update(id, copy.into()).unwrap();
    assert_eq!(store.get::<BTreeNode>(id).unwrap().keys(), &[3, 4]);
}

#[test]
fn test_insert_oversized_block_fails() {
    let mut store = MemStore::new(16);
    let mut node = BTreeNode::leaf(8);
    for key in 0..8 {
        node.insert(key, key).unwrap();
    }

    assert!(matches!(
        store.insert(AnyBlock::from(node)),
        Err(DbError::PageOverflow { .. })
    ));
    // no id leaked
    assert_eq!(store.meta().new_id().unwrap(), 0);
}

// =============================================================================
// Metadata Tests
// =============================================================================

#[test]
fn test_meta_accessors() {
    let mut store = MemStore::default();
    store.insert(Data::new(4).into()).unwrap();
    store.meta_mut().root_id = 0;
    assert_eq!(store.meta().root_id, 0);

    store.set_meta(Metadata::new());
    assert!(store.meta().data_ids.is_empty());
    store.persist().unwrap();
}
