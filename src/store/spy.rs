//! Spy store
//!
//! Decorator counting block reads and writes per block kind.

use crate::block::{AnyBlock, BlockKind, PageId};
use crate::error::Result;
use crate::metadata::Metadata;

use super::Store;

/// Operation counted by a SpyStore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpyOp {
    Read = 0,
    Write = 1,
}

/// Wraps another store and counts successful reads and writes by block kind
///
/// Forwards every call unchanged; the counters are the only added state.
#[derive(Debug)]
pub struct SpyStore<S: Store> {
    inner: S,
    /// counts[op][kind]
    counts: [[u64; BlockKind::COUNT]; 2],
}

impl<S: Store> SpyStore<S> {
    /// Wrap the given store with zeroed counters
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counts: [[0; BlockKind::COUNT]; 2],
        }
    }

    /// Number of successful `op` calls on blocks of `kind`
    pub fn count(&self, op: SpyOp, kind: BlockKind) -> u64 {
        self.counts[op as usize][kind as usize]
    }

    /// Zero all counters
    pub fn reset(&mut self) {
        self.counts = [[0; BlockKind::COUNT]; 2];
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap the delegate store
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn record(&mut self, op: SpyOp, kind: BlockKind) {
        self.counts[op as usize][kind as usize] += 1;
    }
}

impl<S: Store> Store for SpyStore<S> {
    fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    fn insert(&mut self, block: AnyBlock) -> Result<PageId> {
        let kind = block.kind();
        let id = self.inner.insert(block)?;
        self.record(SpyOp::Write, kind);
        Ok(id)
    }

    fn update(&mut self, id: PageId, block: AnyBlock) -> Result<()> {
        let kind = block.kind();
        self.inner.update(id, block)?;
        self.record(SpyOp::Write, kind);
        Ok(())
    }

    fn get_block(&mut self, id: PageId) -> Result<AnyBlock> {
        let block = self.inner.get_block(id)?;
        self.record(SpyOp::Read, block.kind());
        Ok(block)
    }

    fn meta(&self) -> &Metadata {
        self.inner.meta()
    }

    fn meta_mut(&mut self) -> &mut Metadata {
        self.inner.meta_mut()
    }

    fn set_meta(&mut self, meta: Metadata) {
        self.inner.set_meta(meta);
    }

    fn persist(&mut self) -> Result<()> {
        self.inner.persist()?;
        self.record(SpyOp::Write, BlockKind::Metadata);
        Ok(())
    }
}
