//! B+Tree Module
//!
//! Disk-resident B+Tree index mapping sort keys to page ids, built by bulk load.
//!
//! ## Node Page Format
//! ```text
//! ┌─────────────────────────┬──────────────────┬──────────────────────┐
//! │ Header (2)              │ Keys             │ Pointers             │
//! │ kind (msb) | count (15) │ count × Key (2)  │ (count+1) × PageId(2)│
//! └─────────────────────────┴──────────────────┴──────────────────────┘
//! ```
//!
//! ## Bulk Load
//! ```text
//!   sorted key → pointer map
//!            │
//!            ▼
//!   load_leaf      leaves packed full, chained by trailing pointers
//!            │     {first key of leaf → leaf id}
//!            ▼
//!   load_internal  nodes split at ceil(capacity / 2), repeated
//!            │     until one entry remains
//!            ▼
//!   root id written to Metadata
//! ```
//!
//! Lookups and range scans break ties to the right: a key equal to a separator
//! is found in the separator's right subtree, where bulk load placed it.

mod node;
mod tree;

pub use node::{BTreeNode, NodeKind};
pub use tree::BTree;
