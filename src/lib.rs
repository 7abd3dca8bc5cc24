//! # blockdb
//!
//! A block-structured storage engine with a bulk-loaded B+Tree index:
//! - Fixed-size pages in memory or in a single disk file
//! - Page ids allocated densely and tracked by block kind in a Metadata page
//! - Columnar Data blocks chained per key
//! - Point and range lookups with a bounded number of page reads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Database                            │
//! │              (load TSV, scan / index queries)               │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │                               │
//!                ▼                               ▼
//!         ┌─────────────┐                 ┌─────────────┐
//!         │    BTree    │                 │    Data     │
//!         │ (bulk load) │                 │  (columnar) │
//!         └──────┬──────┘                 └──────┬──────┘
//!                │         BTreeNode             │
//!                └───────────────┬───────────────┘
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Store + Metadata                       │
//! │          MemStore  |  DiskStore  |  SpyStore<S>             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod block;
pub mod metadata;
pub mod store;
pub mod btree;
pub mod data;
pub mod record;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DbError, Result};
pub use config::Config;
pub use block::{AnyBlock, Block, BlockKind, Key, PageId, RecordId, StoredBlock, BLOCK_NULL, DEFAULT_PAGE_SIZE, KEY_MAX};
pub use metadata::Metadata;
pub use store::{DiskStore, MemStore, SpyOp, SpyStore, Store};
pub use btree::{BTree, BTreeNode, NodeKind};
pub use data::Data;
pub use record::Record;
pub use database::{mean_fg_pct_home, Database, LoadStats, QueryMode};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blockdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
