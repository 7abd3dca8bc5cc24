//! Error types for blockdb
//!
//! Provides a unified error type for all store, block and index operations.

use thiserror::Error;

use crate::block::{BlockKind, PageId, RecordId};

/// Result type alias using DbError
pub type Result<T> = std::result::Result<T, DbError>;

/// Unified error type for blockdb operations
#[derive(Debug, Error)]
pub enum DbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Block Errors
    // -------------------------------------------------------------------------
    #[error("{kind} block is full: capacity of {capacity} exceeded")]
    CapacityExceeded { kind: BlockKind, capacity: usize },

    #[error("Block {kind} needs {needed} bytes but pages are {page_size} bytes")]
    PageOverflow {
        kind: BlockKind,
        needed: usize,
        page_size: usize,
    },

    #[error("Invalid record id: {0}")]
    InvalidRecordId(RecordId),

    #[error("Corrupted page: {0}")]
    Corrupted(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Block {0} not found")]
    NotFound(PageId),

    #[error("Unknown block id: {0}")]
    UnknownBlockId(PageId),

    #[error("Block {id} is a {found} block, expected {expected}")]
    TypeMismatch {
        id: PageId,
        expected: BlockKind,
        found: BlockKind,
    },

    #[error("Unsupported block kind: {0}")]
    UnsupportedBlockKind(BlockKind),

    #[error("No page ids left to allocate")]
    PageIdsExhausted,

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Internal level needs at least 2 key pointer pairs, got {0}")]
    InsufficientFanIn(usize),

    #[error("Nothing to load")]
    EmptyInput,

    #[error("Malformed B+Tree node: {0}")]
    MalformedNode(String),

    // -------------------------------------------------------------------------
    // Input / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
