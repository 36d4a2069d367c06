use crate::{BackupMeta, BackupRecord, SnapshotStorage};
use anyhow::{Context, Result};
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_SNAPSHOTS: &str = "snapshots";
const TREE_META: &str = "meta";
const KEY_LATEST: &[u8] = b"latest";

/// Snapshot bodies are stored as the JSON peers exchange; the metadata index
/// is bincode.
#[derive(Clone)]
pub struct SledStore {
  db: Db,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let db = sled::open(path).with_context(|| format!("open sled at {}", path.display()))?;
    info!(path = %path.display(), "sled store opened");
    Ok(Self { db })
  }

  fn snapshots(&self) -> Result<Tree> {
    Ok(self.db.open_tree(TREE_SNAPSHOTS)?)
  }

  fn meta(&self) -> Result<Tree> {
    Ok(self.db.open_tree(TREE_META)?)
  }

  pub fn close(&self) -> Result<()> {
    self.db.flush()?;
    Ok(())
  }

  pub fn clear(&self) -> Result<()> {
    self.snapshots()?.clear()?;
    self.meta()?.clear()?;
    self.db.remove(KEY_LATEST)?;
    self.db.flush()?;
    Ok(())
  }

  fn latest_sequence(&self) -> Result<Option<u64>> {
    Ok(self.db.get(KEY_LATEST)?.map(|v| decode_sequence(&v)).transpose()?)
  }
}

fn decode_sequence(bytes: &[u8]) -> Result<u64> {
  let arr: [u8; 8] = bytes.try_into().context("sequence key is not 8 bytes")?;
  Ok(u64::from_be_bytes(arr))
}

impl SnapshotStorage for SledStore {
  fn put_snapshot(&self, record: &BackupRecord) -> Result<BackupMeta> {
    let sequence = self.db.generate_id()?;
    let key = sequence.to_be_bytes();
    let meta = BackupMeta {
      sequence,
      length: record.length as u64,
      tip_hash: record.tip_hash().map(str::to_owned),
      date: record.date.clone(),
    };

    self.snapshots()?.insert(key, serde_json::to_vec(record)?)?;
    self.meta()?.insert(key, bincode::serialize(&meta)?)?;
    self.db.insert(KEY_LATEST, &key[..])?;
    self.db.flush()?;
    debug!(sequence, length = meta.length, "stored snapshot");
    Ok(meta)
  }

  fn latest_snapshot(&self) -> Result<Option<BackupRecord>> {
    let Some(sequence) = self.latest_sequence()? else {
      return Ok(None);
    };
    let Some(bytes) = self.snapshots()?.get(sequence.to_be_bytes())? else {
      return Ok(None);
    };
    let record = serde_json::from_slice(&bytes)
      .with_context(|| format!("decode snapshot {sequence}"))?;
    Ok(Some(record))
  }

  fn list_meta(&self) -> Result<Vec<BackupMeta>> {
    self
      .meta()?
      .iter()
      .values()
      .map(|v| -> Result<BackupMeta> { Ok(bincode::deserialize(&v?)?) })
      .collect()
  }

  fn retain_latest(&self, keep: usize) -> Result<usize> {
    let meta = self.meta()?;
    let snapshots = self.snapshots()?;
    let excess = meta.len().saturating_sub(keep);
    let stale: Vec<_> = meta.iter().keys().take(excess).collect::<Result<_, _>>()?;
    for key in &stale {
      meta.remove(key)?;
      snapshots.remove(key)?;
    }
    if !stale.is_empty() {
      self.db.flush()?;
      debug!(removed = stale.len(), "pruned old snapshots");
    }
    Ok(stale.len())
  }
}
