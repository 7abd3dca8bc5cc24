//! Tests for the games database
//!
//! These tests verify:
//! - TSV loading into per-key Data chains and a dense index
//! - Scan and index queries returning the same records
//! - Index queries reading fewer blocks than full scans
//! - Databases reopened from disk

use std::io::Cursor;
use std::path::PathBuf;

use blockdb::record::TSV_HEADER;
use blockdb::{
    mean_fg_pct_home, BlockKind, Data, Database, DbError, DiskStore, Key, MemStore, QueryMode,
    Record, SpyOp, SpyStore, Store,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

const PAGE_SIZE: usize = 4096;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("games.db");
    (temp_dir, path)
}

/// One games row with the given FG_PCT_home in thousandths
fn row(fg_pct: u16, pts: u8) -> String {
    format!(
        "{}/1/2020\t1610612739\t{}\t0.{:03}\t0.750\t0.350\t20\t40\t1",
        pts % 28 + 1,
        pts,
        fg_pct
    )
}

/// A games TSV and the key of each of its rows
fn games_tsv(keys: &[u16]) -> String {
    let mut tsv = format!("{}\n", TSV_HEADER);
    for (i, key) in keys.iter().enumerate() {
        tsv.push_str(&row(*key, (i % 200) as u8));
        tsv.push('\n');
    }
    tsv
}

fn random_keys(seed: u64, count: usize) -> Vec<u16> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.random_range(300..700)).collect()
}

fn sorted_rows(records: &[Record]) -> Vec<String> {
    let mut rows: Vec<String> = records.iter().map(Record::to_tsv).collect();
    rows.sort();
    rows
}

fn count_in(keys: &[u16], begin: Key, end: Key) -> usize {
    keys.iter().filter(|k| (begin..=end).contains(*k)).count()
}

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_counts() {
    let keys = random_keys(1, 2000);
    let mut db = Database::new(MemStore::default());

    let stats = db.load(Cursor::new(games_tsv(&keys))).unwrap();
    assert_eq!(stats.records, 2000);
    // under 1023 distinct keys fit a single root leaf
    assert_eq!(stats.levels, 1);

    let mut distinct = keys.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(db.root_keys().unwrap(), distinct);
    // no key has more than one block's worth of records
    assert_eq!(db.store().meta().data_ids.len(), distinct.len());
    assert_eq!(db.store().meta().btree_ids.len(), 1);
}

#[test]
fn test_load_chains_overflowing_keys() {
    let capacity = Data::capacity_for(PAGE_SIZE) as usize;
    let keys = vec![500; capacity * 2 + 1];
    let mut db = Database::new(MemStore::default());
    db.load(Cursor::new(games_tsv(&keys))).unwrap();

    assert_eq!(db.store().meta().data_ids.len(), 3);

    // the index points at the chain head, which links through the rest
    let head = db.index().unwrap().get(500).unwrap();
    let store = db.store_mut();
    let first: Data = store.get(head).unwrap();
    let second: Data = store.get(first.next_id).unwrap();
    let third: Data = store.get(second.next_id).unwrap();
    assert_eq!(first.count(), capacity);
    assert_eq!(second.count(), capacity);
    assert_eq!(third.count(), 1);
    assert_eq!(third.next_id, blockdb::BLOCK_NULL);

    let records = db.query(QueryMode::Index, 500, 500).unwrap();
    assert_eq!(records.len(), keys.len());
}

#[test]
fn test_load_skips_blank_lines() {
    let tsv = format!("{}\n{}\n\n{}\n", TSV_HEADER, row(450, 1), row(451, 2));
    let mut db = Database::new(MemStore::default());
    assert_eq!(db.load(Cursor::new(tsv)).unwrap().records, 2);
}

#[test]
fn test_load_reports_bad_line() {
    let tsv = format!("{}\n{}\nnot a row\n", TSV_HEADER, row(450, 1));
    let mut db = Database::new(MemStore::default());
    match db.load(Cursor::new(tsv)) {
        Err(DbError::Parse(msg)) => assert!(msg.starts_with("line 3"), "{}", msg),
        other => panic!("expected parse error, got {:?}", other.map(|s| s.records)),
    }
}

#[test]
fn test_load_header_only() {
    let mut db = Database::new(MemStore::default());
    let stats = db.load(Cursor::new(format!("{}\n", TSV_HEADER))).unwrap();
    assert_eq!((stats.records, stats.levels), (0, 0));
    assert!(db.root_keys().unwrap().is_empty());
    assert!(db.query(QueryMode::Index, 0, Key::MAX).unwrap().is_empty());
}

#[test]
fn test_load_builds_multi_level_index() {
    let keys: Vec<u16> = (0..999).collect();
    let mut db = Database::with_node_capacity(MemStore::default(), 8).unwrap();
    let stats = db.load(Cursor::new(games_tsv(&keys))).unwrap();
    assert!(stats.levels >= 3);

    let records = db.query(QueryMode::Index, 100, 199).unwrap();
    assert_eq!(records.len(), 100);
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_scan_and_index_agree() {
    let keys = random_keys(2, 3000);
    let mut db = Database::with_node_capacity(MemStore::default(), 16).unwrap();
    db.load(Cursor::new(games_tsv(&keys))).unwrap();

    for (begin, end) in [(600, 900), (300, 310), (0, 299), (450, 450), (699, 1000)] {
        let scan = db.query(QueryMode::Scan, begin, end).unwrap();
        let index = db.query(QueryMode::Index, begin, end).unwrap();
        assert_eq!(scan.len(), count_in(&keys, begin, end));
        assert_eq!(sorted_rows(&scan), sorted_rows(&index));
        assert!(scan.iter().all(|r| (begin..=end).contains(&r.key())));
    }
}

#[test]
fn test_index_query_returns_key_order() {
    let keys = random_keys(3, 500);
    let mut db = Database::new(MemStore::default());
    db.load(Cursor::new(games_tsv(&keys))).unwrap();

    let records = db.query(QueryMode::Index, 400, 600).unwrap();
    assert!(records.windows(2).all(|pair| pair[0].key() <= pair[1].key()));
}

#[test]
fn test_index_reads_fewer_blocks_than_scan() {
    let (_temp, path) = setup_temp_db();
    let keys = random_keys(4, 5000);
    let store = SpyStore::new(DiskStore::open(&path, PAGE_SIZE).unwrap());
    let mut db = Database::new(store);
    db.load(Cursor::new(games_tsv(&keys))).unwrap();

    assert!(db.store().count(SpyOp::Write, BlockKind::Data) > 0);
    assert!(db.store().count(SpyOp::Write, BlockKind::BTreeNode) > 0);
    let data_blocks = db.store().meta().data_ids.len() as u64;

    db.store_mut().reset();
    let index = db.query(QueryMode::Index, 600, 650).unwrap();
    let index_reads = db.store().count(SpyOp::Read, BlockKind::BTreeNode);
    let index_data_reads = db.store().count(SpyOp::Read, BlockKind::Data);
    assert!(index_reads < data_blocks);
    assert!(index_data_reads < data_blocks);

    db.store_mut().reset();
    let scan = db.query(QueryMode::Scan, 600, 650).unwrap();
    assert_eq!(db.store().count(SpyOp::Read, BlockKind::BTreeNode), 0);
    // every block read exactly once
    assert_eq!(db.store().count(SpyOp::Read, BlockKind::Data), data_blocks);

    assert_eq!(sorted_rows(&scan), sorted_rows(&index));
}

#[test]
fn test_reopened_database_answers_queries() {
    let (_temp, path) = setup_temp_db();
    let keys = random_keys(5, 1500);
    {
        let mut db = Database::new(DiskStore::open(&path, PAGE_SIZE).unwrap());
        db.load(Cursor::new(games_tsv(&keys))).unwrap();
    }

    let mut db = Database::new(DiskStore::open(&path, PAGE_SIZE).unwrap());
    let records = db.query(QueryMode::Index, 500, 699).unwrap();
    assert_eq!(records.len(), count_in(&keys, 500, 699));
    assert!(!db.root_keys().unwrap().is_empty());
}

#[test]
fn test_mean_fg_pct_home() {
    let tsv = format!("{}\n{}\n{}\n", TSV_HEADER, row(600, 1), row(800, 2));
    let mut db = Database::new(MemStore::default());
    db.load(Cursor::new(tsv)).unwrap();

    let records = db.query(QueryMode::Index, 600, 900).unwrap();
    assert!((mean_fg_pct_home(&records) - 0.7).abs() < 1e-6);
}

#[test]
fn test_with_node_capacity_rejects_oversized_nodes() {
    assert!(matches!(
        Database::with_node_capacity(MemStore::new(64), 100),
        Err(DbError::Config(_))
    ));
    assert!(Database::with_node_capacity(MemStore::new(64), 0).is_err());
}
