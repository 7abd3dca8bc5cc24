//! Data block
//!
//! Columnar page of records, kept sorted by key, with a link to an overflow
//! block.
//!
//! ## Page Format
//! ```text
//! ┌───────────┬─────────────┬──────────────────────────────────────────────┐
//! │ Count (1) │ Next id (2) │ Columns, each Count values wide              │
//! │ u8        │ PageId      │ date i64 | team u32 | fg f32 | ft f32 |      │
//! │           │             │ fg3 f32 | pts u8 | ast u8 | reb u8 | win u8  │
//! └───────────┴─────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Storing each field as its own column keeps scans over a single field
//! within one contiguous run of the page.

use bytes::{Buf, BufMut};

use crate::block::{
    ensure_fits, ensure_readable, Block, BlockKind, Key, PageId, RecordId, BLOCK_NULL, KEY_MAX,
};
use crate::error::{DbError, Result};
use crate::record::Record;

/// Header size: Count (1) + Next id (2) = 3 bytes
pub const HEADER_SIZE: usize = 3;

/// Block of records sorted by key
///
/// Record ids are handed out in insertion order and stay valid as later
/// inserts shift records between column positions.
#[derive(Debug, Clone)]
pub struct Data {
    capacity: u8,
    /// Column position of each record id
    record_pos: Vec<usize>,

    game_date_est: Vec<i64>,
    team_id_home: Vec<u32>,
    fg_pct_home: Vec<f32>,
    ft_pct_home: Vec<f32>,
    fg3_pct_home: Vec<f32>,
    pts_home: Vec<u8>,
    ast_home: Vec<u8>,
    reb_home: Vec<u8>,
    home_team_wins: Vec<u8>,

    /// Overflow block holding more records for the same key, or BLOCK_NULL
    pub next_id: PageId,
}

impl Data {
    /// Create an empty block holding at most `capacity` records
    pub fn new(capacity: u8) -> Self {
        Self {
            capacity,
            record_pos: Vec::new(),
            game_date_est: Vec::new(),
            team_id_home: Vec::new(),
            fg_pct_home: Vec::new(),
            ft_pct_home: Vec::new(),
            fg3_pct_home: Vec::new(),
            pts_home: Vec::new(),
            ast_home: Vec::new(),
            reb_home: Vec::new(),
            home_team_wins: Vec::new(),
            next_id: BLOCK_NULL,
        }
    }

    /// Record capacity of a block filling one page
    ///
    /// Capped at 255 since the count header is one byte.
    pub fn capacity_for(page_size: usize) -> u8 {
        let capacity = page_size.saturating_sub(HEADER_SIZE) / Record::SIZE;
        capacity.min(u8::MAX as usize) as u8
    }

    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    /// Number of records held
    pub fn count(&self) -> usize {
        self.fg_pct_home.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fg_pct_home.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.count() >= self.capacity as usize
    }

    /// Smallest key held, or `KEY_MAX` if empty
    pub fn key(&self) -> Key {
        self.fg_pct_home
            .first()
            .map_or(KEY_MAX, |value| Record::to_key(*value))
    }

    /// Insert a record in key order, returning its id
    ///
    /// Records with equal keys keep their insertion order.
    pub fn insert(&mut self, record: &Record) -> Result<RecordId> {
        if self.is_full() {
            return Err(DbError::CapacityExceeded {
                kind: BlockKind::Data,
                capacity: self.capacity as usize,
            });
        }

        let key = record.key();
        let at = self
            .fg_pct_home
            .partition_point(|value| Record::to_key(*value) <= key);

        self.game_date_est.insert(at, record.game_date_est);
        self.team_id_home.insert(at, record.team_id_home);
        self.fg_pct_home.insert(at, record.fg_pct_home);
        self.ft_pct_home.insert(at, record.ft_pct_home);
        self.fg3_pct_home.insert(at, record.fg3_pct_home);
        self.pts_home.insert(at, record.pts_home);
        self.ast_home.insert(at, record.ast_home);
        self.reb_home.insert(at, record.reb_home);
        self.home_team_wins.insert(at, record.home_team_wins as u8);

        for pos in self.record_pos.iter_mut().filter(|pos| **pos >= at) {
            *pos += 1;
        }
        let id = self.record_pos.len() as RecordId;
        self.record_pos.push(at);
        Ok(id)
    }

    /// Record with the given id
    pub fn get(&self, id: RecordId) -> Result<Record> {
        let pos = *self
            .record_pos
            .get(id as usize)
            .ok_or(DbError::InvalidRecordId(id))?;
        Ok(self.record_at(pos))
    }

    /// Ids of all records with the given key
    pub fn find(&self, key: Key) -> Vec<RecordId> {
        self.record_pos
            .iter()
            .enumerate()
            .filter(|(_, pos)| Record::to_key(self.fg_pct_home[**pos]) == key)
            .map(|(id, _)| id as RecordId)
            .collect()
    }

    /// All records in column (key) order
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.count()).map(|pos| self.record_at(pos))
    }

    /// Size of this block once encoded
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.count() * Record::SIZE
    }

    fn record_at(&self, pos: usize) -> Record {
        Record {
            game_date_est: self.game_date_est[pos],
            team_id_home: self.team_id_home[pos],
            fg_pct_home: self.fg_pct_home[pos],
            ft_pct_home: self.ft_pct_home[pos],
            fg3_pct_home: self.fg3_pct_home[pos],
            pts_home: self.pts_home[pos],
            ast_home: self.ast_home[pos],
            reb_home: self.reb_home[pos],
            home_team_wins: self.home_team_wins[pos] != 0,
        }
    }
}

impl PartialEq for Data {
    /// Compares stored columns; capacity is derived from the page on read
    /// and record id assignment is not persisted
    fn eq(&self, other: &Self) -> bool {
        self.next_id == other.next_id
            && self.game_date_est == other.game_date_est
            && self.team_id_home == other.team_id_home
            && self.fg_pct_home == other.fg_pct_home
            && self.ft_pct_home == other.ft_pct_home
            && self.fg3_pct_home == other.fg3_pct_home
            && self.pts_home == other.pts_home
            && self.ast_home == other.ast_home
            && self.reb_home == other.reb_home
            && self.home_team_wins == other.home_team_wins
    }
}

impl Block for Data {
    const KIND: BlockKind = BlockKind::Data;

    /// Decode a page; record ids of the result follow column order
    fn read(page: &[u8]) -> Result<Self> {
        ensure_readable(Self::KIND, HEADER_SIZE, page)?;

        let mut buf = page;
        let count = buf.get_u8() as usize;
        let next_id = buf.get_u16_le();

        ensure_readable(Self::KIND, HEADER_SIZE + count * Record::SIZE, page)?;

        let mut data = Self::new(Self::capacity_for(page.len()));
        data.next_id = next_id;
        data.game_date_est = (0..count).map(|_| buf.get_i64_le()).collect();
        data.team_id_home = (0..count).map(|_| buf.get_u32_le()).collect();
        data.fg_pct_home = (0..count).map(|_| buf.get_f32_le()).collect();
        data.ft_pct_home = (0..count).map(|_| buf.get_f32_le()).collect();
        data.fg3_pct_home = (0..count).map(|_| buf.get_f32_le()).collect();
        data.pts_home = buf.copy_to_bytes(count).to_vec();
        data.ast_home = buf.copy_to_bytes(count).to_vec();
        data.reb_home = buf.copy_to_bytes(count).to_vec();
        data.home_team_wins = buf.copy_to_bytes(count).to_vec();
        data.record_pos = (0..count).collect();

        Ok(data)
    }

    fn write(&self, page: &mut [u8]) -> Result<usize> {
        let len = self.encoded_len();
        ensure_fits(Self::KIND, len, page)?;

        let mut buf = &mut page[..len];
        buf.put_u8(self.count() as u8);
        buf.put_u16_le(self.next_id);
        for value in &self.game_date_est {
            buf.put_i64_le(*value);
        }
        for value in &self.team_id_home {
            buf.put_u32_le(*value);
        }
        for column in [&self.fg_pct_home, &self.ft_pct_home, &self.fg3_pct_home] {
            for value in column {
                buf.put_f32_le(*value);
            }
        }
        buf.put_slice(&self.pts_home);
        buf.put_slice(&self.ast_home);
        buf.put_slice(&self.reb_home);
        buf.put_slice(&self.home_team_wins);

        Ok(len)
    }
}
