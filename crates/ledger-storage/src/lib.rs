//! Backups of a node's chain: a sled history plus a JSON file on disk.

pub mod backup;
pub mod sled_store;

use anyhow::Result;
use chrono::{DateTime, Local};
use ledger_core::{Block, ChainSnapshot};
use serde::{Deserialize, Serialize};

/// Layout of `date` in backup records.
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// A snapshot of the chain together with the local time it was taken.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub chain: Vec<Block>,
    pub length: usize,
    pub date: String,
}

impl BackupRecord {
    pub fn new(snapshot: ChainSnapshot, taken_at: DateTime<Local>) -> Self {
        Self {
            chain: snapshot.chain,
            length: snapshot.length,
            date: taken_at.format(DATE_FORMAT).to_string(),
        }
    }

    pub fn capture(snapshot: ChainSnapshot) -> Self {
        Self::new(snapshot, Local::now())
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self.chain.clone(),
            length: self.length,
        }
    }

    pub fn tip_hash(&self) -> Option<&str> {
        self.chain.last().and_then(Block::hash)
    }
}

/// Index entry kept next to every stored backup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMeta {
    pub sequence: u64,
    pub length: u64,
    pub tip_hash: Option<String>,
    pub date: String,
}

pub trait SnapshotStorage: Send + Sync {
    fn put_snapshot(&self, record: &BackupRecord) -> Result<BackupMeta>;
    fn latest_snapshot(&self) -> Result<Option<BackupRecord>>;
    /// Metadata of every stored backup, oldest first.
    fn list_meta(&self) -> Result<Vec<BackupMeta>>;
    /// Drop all but the newest `keep` backups, returning how many were removed.
    fn retain_latest(&self, keep: usize) -> Result<usize>;
}
