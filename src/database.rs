//! Database
//!
//! Loads the games TSV into Data block chains indexed by a B+Tree, and answers
//! range queries over FG_PCT_home by full scan or through the index.
//!
//! ## Load
//! ```text
//!   TSV rows ──► group by key ──► Data chains ──► store (tail first)
//!                                                      │
//!                                  {key → chain head} ◄┘
//!                                          │
//!                                          ▼
//!                                  BTree::bulk_load ──► persist
//! ```
//!
//! Every Data block holds records of a single key, so the index is dense: one
//! leaf entry per distinct key, pointing at the head of that key's chain.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::block::{BlockKind, Key, PageId, BLOCK_NULL};
use crate::btree::{BTree, BTreeNode};
use crate::data::Data;
use crate::error::{DbError, Result};
use crate::record::{Record, TSV_HEADER};
use crate::store::Store;

/// How a query finds the Data blocks to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Read every Data block in the store
    Scan,
    /// Read only the chains the B+Tree returns for the key range
    Index,
}

impl FromStr for QueryMode {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scan" => Ok(QueryMode::Scan),
            "index" => Ok(QueryMode::Index),
            other => Err(DbError::Parse(format!(
                "unsupported query mode: {} (expected scan or index)",
                other
            ))),
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Scan => f.write_str("scan"),
            QueryMode::Index => f.write_str("index"),
        }
    }
}

/// Outcome of a load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Records read from the input
    pub records: usize,
    /// Levels in the B+Tree built over them
    pub levels: usize,
}

/// Games database over a block store
pub struct Database<S: Store> {
    store: S,
    /// Key capacity of index nodes
    node_capacity: u16,
}

impl<S: Store> Database<S> {
    /// Open a database whose index nodes fill one page
    pub fn new(store: S) -> Self {
        let node_capacity = BTreeNode::capacity_for(store.page_size());
        Self {
            store,
            node_capacity,
        }
    }

    /// Open a database with index nodes of the given key capacity
    pub fn with_node_capacity(store: S, node_capacity: u16) -> Result<Self> {
        if node_capacity == 0 || node_capacity > BTreeNode::capacity_for(store.page_size()) {
            return Err(DbError::Config(format!(
                "node capacity {} does not fit a {} byte page",
                node_capacity,
                store.page_size()
            )));
        }
        Ok(Self {
            store,
            node_capacity,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Key capacity of index nodes
    pub fn node_capacity(&self) -> u16 {
        self.node_capacity
    }

    /// B+Tree index over this database's store
    pub fn index(&mut self) -> Result<BTree<'_, S>> {
        BTree::with_capacity(&mut self.store, self.node_capacity)
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Load a games TSV (header line first) and build the index over it
    ///
    /// Meant for a fresh store: blocks from an earlier load stay allocated but
    /// drop out of the rebuilt index.
    pub fn load<R: BufRead>(&mut self, reader: R) -> Result<LoadStats> {
        let capacity = Data::capacity_for(self.store.page_size());
        if capacity == 0 {
            return Err(DbError::Config(format!(
                "a {} byte page cannot hold a record",
                self.store.page_size()
            )));
        }

        // records of each key packed into a chain of blocks
        let mut chains: BTreeMap<Key, Vec<Data>> = BTreeMap::new();
        let mut records = 0;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if index == 0 {
                if line.trim_end() != TSV_HEADER {
                    warn!(header = %line, "unexpected header line, skipping it anyway");
                }
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }

            let record = Record::from_tsv(&line).map_err(|e| match e {
                DbError::Parse(msg) => DbError::Parse(format!("line {}: {}", index + 1, msg)),
                other => other,
            })?;

            let chain = chains.entry(record.key()).or_default();
            match chain.last_mut() {
                Some(block) if !block.is_full() => {
                    block.insert(&record)?;
                }
                _ => {
                    let mut block = Data::new(capacity);
                    block.insert(&record)?;
                    chain.push(block);
                }
            }
            records += 1;
        }

        // tail first, so each block's overflow id is known when it is written
        let mut heads: BTreeMap<Key, PageId> = BTreeMap::new();
        for (key, chain) in chains {
            let mut next_id = BLOCK_NULL;
            for mut block in chain.into_iter().rev() {
                block.next_id = next_id;
                next_id = self.store.insert(block.into())?;
            }
            heads.insert(key, next_id);
        }

        let levels = self.index()?.bulk_load(&heads)?;
        self.store.persist()?;

        info!(
            records,
            keys = heads.len(),
            data_blocks = self.store.meta().data_ids.len(),
            index_nodes = self.store.meta().btree_ids.len(),
            levels,
            "load complete"
        );
        Ok(LoadStats { records, levels })
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Records with keys in `[begin, end]`
    ///
    /// Both modes follow overflow chains and read each Data block at most once;
    /// they differ only in which blocks they start from.
    pub fn query(&mut self, mode: QueryMode, begin: Key, end: Key) -> Result<Vec<Record>> {
        let start_ids = match mode {
            QueryMode::Scan => self.store.kind_ids(BlockKind::Data)?,
            QueryMode::Index => self.index()?.range(begin, end)?,
        };

        let mut queue: VecDeque<PageId> = start_ids.into();
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }

            let data: Data = self.store.get(id)?;
            let key = data.key();
            if key < begin || key > end {
                continue;
            }

            // a block holds a single key, so every record matches
            records.extend(data.records());
            if data.next_id != BLOCK_NULL {
                queue.push_back(data.next_id);
            }
        }

        debug!(%mode, begin, end, blocks = seen.len(), records = records.len(), "query complete");
        Ok(records)
    }

    /// Keys held by the index root, empty if nothing is loaded
    pub fn root_keys(&mut self) -> Result<Vec<Key>> {
        let root = self.store.meta().root_id;
        if root == BLOCK_NULL {
            return Ok(Vec::new());
        }
        let node: BTreeNode = self.store.get(root)?;
        Ok(node.keys().to_vec())
    }
}

/// Mean FG_PCT_home of the records, NaN if there are none
pub fn mean_fg_pct_home(records: &[Record]) -> f64 {
    let sum: f64 = records.iter().map(|r| r.fg_pct_home as f64).sum();
    sum / records.len() as f64
}
