//! Tests for the B+Tree node block
//!
//! These tests verify:
//! - Sorted insertion for leaf and internal nodes
//! - Capacity enforcement
//! - Page encoding round trips and corruption detection

use blockdb::{Block, BTreeNode, DbError, NodeKind, BLOCK_NULL};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PAGE_SIZE: usize = 4096;

// =============================================================================
// Helper Functions
// =============================================================================

/// Fill a node of the given kind with keys inserted in descending order
fn filled_node(kind: NodeKind, capacity: u16) -> BTreeNode {
    let mut node = BTreeNode::new(kind, capacity);
    for key in (1..=capacity).rev() {
        node.insert(key, key).unwrap();
    }
    node
}

fn is_sorted(keys: &[u16]) -> bool {
    keys.windows(2).all(|pair| pair[0] <= pair[1])
}

// =============================================================================
// Insert Tests
// =============================================================================

#[test]
fn test_leaf_insert_pairs_keys_with_pointers() {
    let mut node = BTreeNode::leaf(4);
    node.insert(20, 200).unwrap();
    node.insert(10, 100).unwrap();
    node.insert(30, 300).unwrap();

    assert_eq!(node.keys(), &[10, 20, 30]);
    // trailing pointer is the next leaf link
    assert_eq!(node.pointers(), &[100, 200, 300, BLOCK_NULL]);
    assert_eq!(node.next_leaf(), Some(BLOCK_NULL));
}

#[test]
fn test_internal_first_insert_keeps_only_pointer() {
    let mut node = BTreeNode::internal(4);
    node.insert(5, 50).unwrap();
    assert!(node.keys().is_empty());
    assert_eq!(node.pointers(), &[50]);

    node.insert(30, 300).unwrap();
    node.insert(10, 100).unwrap();
    assert_eq!(node.keys(), &[10, 30]);
    assert_eq!(node.pointers(), &[50, 100, 300]);
}

#[test]
fn test_leaf_duplicates_go_after_equal_keys() {
    let mut node = BTreeNode::leaf(4);
    node.insert(7, 1).unwrap();
    node.insert(7, 2).unwrap();
    node.insert(3, 3).unwrap();

    assert_eq!(node.keys(), &[3, 7, 7]);
    assert_eq!(node.pointers(), &[3, 1, 2, BLOCK_NULL]);
}

#[test]
fn test_insert_beyond_capacity_fails() {
    let mut node = filled_node(NodeKind::Leaf, 3);
    assert!(node.is_full());
    assert!(matches!(
        node.insert(9, 9),
        Err(DbError::CapacityExceeded { capacity: 3, .. })
    ));
    assert_eq!(node.len(), 3);
}

#[test]
fn test_random_inserts_stay_sorted() {
    let mut rng = StdRng::seed_from_u64(7);
    for kind in [NodeKind::Leaf, NodeKind::Internal] {
        let mut node = BTreeNode::new(kind, 64);
        while !node.is_full() {
            node.insert(rng.random_range(0..1000), rng.random()).unwrap();
            assert!(is_sorted(node.keys()));
            if !node.is_empty() {
                assert_eq!(node.pointers().len(), node.len() + 1);
            }
        }
    }
}

#[test]
fn test_distinct_keys_stay_strictly_ascending() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut node = BTreeNode::leaf(128);
    let mut seen = std::collections::HashSet::new();
    while !node.is_full() {
        let key: u16 = rng.random();
        if seen.insert(key) {
            node.insert(key, key).unwrap();
            assert!(node.keys().windows(2).all(|pair| pair[0] < pair[1]));
        }
    }
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_full_node_fits_page_and_round_trips() {
    let capacity = BTreeNode::capacity_for(PAGE_SIZE);
    for kind in [NodeKind::Leaf, NodeKind::Internal] {
        let node = filled_node(kind, capacity);

        let mut page = vec![0u8; PAGE_SIZE];
        let written = node.write(&mut page).unwrap();
        assert!(written <= PAGE_SIZE);

        let read = BTreeNode::read(&page).unwrap();
        assert_eq!(read, node);
        assert_eq!(read.kind(), kind);
    }
}

#[test]
fn test_read_ignores_trailing_bytes() {
    let mut node = BTreeNode::leaf(BTreeNode::capacity_for(256));
    node.insert(4, 40).unwrap();

    let mut page = vec![0xEEu8; 256];
    node.write(&mut page).unwrap();
    assert_eq!(BTreeNode::read(&page).unwrap(), node);
}

#[test]
fn test_empty_node_round_trips() {
    let node = BTreeNode::leaf(BTreeNode::capacity_for(64));
    let mut page = [0u8; 64];
    node.write(&mut page).unwrap();

    let read = BTreeNode::read(&page).unwrap();
    assert!(read.is_empty());
    assert!(read.is_leaf());
}

#[test]
fn test_write_to_small_page_fails() {
    let node = filled_node(NodeKind::Leaf, 8);
    let mut page = [0u8; 16];
    assert!(matches!(
        node.write(&mut page),
        Err(DbError::PageOverflow { .. })
    ));
}

#[test]
fn test_read_truncated_page_fails() {
    // leaf header claiming 100 keys
    let mut page = [0u8; 32];
    page[..2].copy_from_slice(&(0x8000u16 | 100).to_le_bytes());
    assert!(matches!(BTreeNode::read(&page), Err(DbError::Corrupted(_))));
}
