//! Configuration for blockdb
//!
//! Centralized configuration with sensible defaults.

use crate::block::{Key, DEFAULT_PAGE_SIZE};
use crate::btree::BTreeNode;
use crate::data::Data;
use crate::error::{DbError, Result};
use crate::metadata;
use crate::record::Record;

/// Main configuration for a blockdb instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Size of every page in bytes
    ///
    /// Not recorded in the database file: a database must be reopened with
    /// the page size it was created with.
    pub page_size: usize,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Keys per B+Tree node, overriding the page-derived fan-out
    ///
    /// Capped at what fits in one page.
    pub node_capacity: Option<u16>,

    // -------------------------------------------------------------------------
    // Query Configuration
    // -------------------------------------------------------------------------
    /// Lower bound of the FG_PCT_home query range (inclusive)
    pub query_begin: f32,

    /// Upper bound of the FG_PCT_home query range (inclusive)
    pub query_end: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            node_capacity: None,
            query_begin: 0.6,
            query_end: 0.9,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that pages can hold every block kind
    pub fn validate(&self) -> Result<()> {
        let smallest = metadata::HEADER_SIZE.max(crate::data::HEADER_SIZE + Record::SIZE);
        if self.page_size < smallest || BTreeNode::capacity_for(self.page_size) == 0 {
            return Err(DbError::Config(format!(
                "page size {} is too small, need at least {} bytes",
                self.page_size, smallest
            )));
        }
        if self.node_capacity == Some(0) {
            return Err(DbError::Config(
                "B+Tree nodes must hold at least one key".to_string(),
            ));
        }
        if self.query_begin.is_nan() || self.query_end.is_nan() {
            return Err(DbError::Config("query bounds must be numbers".to_string()));
        }
        Ok(())
    }

    /// Keys per B+Tree node after applying the page size cap
    pub fn node_capacity(&self) -> u16 {
        let fits = BTreeNode::capacity_for(self.page_size);
        self.node_capacity.map_or(fits, |capacity| capacity.min(fits))
    }

    /// Records per data block
    pub fn data_capacity(&self) -> u8 {
        Data::capacity_for(self.page_size)
    }

    /// Query range as keys
    pub fn query_keys(&self) -> (Key, Key) {
        (Record::to_key(self.query_begin), Record::to_key(self.query_end))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the page size (in bytes)
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the B+Tree node key capacity
    pub fn node_capacity(mut self, capacity: u16) -> Self {
        self.config.node_capacity = Some(capacity);
        self
    }

    /// Set the inclusive query range over FG_PCT_home
    pub fn query_range(mut self, begin: f32, end: f32) -> Self {
        self.config.query_begin = begin;
        self.config.query_end = end;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
