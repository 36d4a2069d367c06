//! Periodic backups of the node's chain.

use anyhow::{Context, Result};
use ledger_core::{Ledger, PeerTransport, ReportedChain};
use ledger_storage::backup::write_json_backup;
use ledger_storage::sled_store::SledStore;
use ledger_storage::{BackupMeta, BackupRecord, SnapshotStorage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

pub struct BackupJob<T> {
    pub ledger: Arc<Ledger<T>>,
    pub store: Arc<SledStore>,
    pub dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub keep: usize,
}

impl<T: PeerTransport + 'static> BackupJob<T> {
    /// Take one backup: capture the chain under the ledger lock, overwrite the
    /// JSON file, append to sled and prune old entries.
    pub fn run_once(&self) -> Result<BackupMeta> {
        let record = self
            .ledger
            .with_chain(|chain| BackupRecord::capture(chain.snapshot()))?;
        let path = write_json_backup(&self.dir, &self.host, self.port, &record)?;
        let meta = self.store.put_snapshot(&record)?;
        let pruned = self.store.retain_latest(self.keep)?;
        info!(
            sequence = meta.sequence,
            length = meta.length,
            file = %path.display(),
            pruned,
            "backup written"
        );
        Ok(meta)
    }

    /// Back up every `period` until `shutdown` flips. The first backup happens
    /// one period after start.
    pub fn spawn(self, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let job = Arc::new(self);
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let job = job.clone();
                        match tokio::task::spawn_blocking(move || job.run_once()).await {
                            Ok(Ok(_)) => {}
                            Ok(Err(err)) => warn!(error = %err, "backup failed"),
                            Err(err) => warn!(error = %err, "backup task panicked"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("backup loop stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}

/// Adopt the newest stored backup, re-validating every block.
pub fn restore_latest<T: PeerTransport>(ledger: &Ledger<T>, store: &SledStore) -> Result<Option<usize>> {
    let Some(record) = store.latest_snapshot()? else {
        return Ok(None);
    };
    let reported = ReportedChain::from(&record.snapshot());
    let length = ledger
        .adopt("backup", &reported)
        .with_context(|| format!("restore backup taken {}", record.date))?;
    Ok(Some(length))
}
