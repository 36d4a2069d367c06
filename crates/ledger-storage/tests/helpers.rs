#![allow(dead_code)]

use std::fs;
use std::sync::Arc;

use ledger_core::{pow, validate, ChainSnapshot, ChainStore, FixedClock};
use ledger_storage::sled_store::SledStore;
use tempfile::{tempdir, TempDir};

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (
        temp_dir,
        SledStore::open(&db_path).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

/// A valid chain of `len` blocks mined at difficulty 1.
pub fn chain_snapshot(len: usize) -> ChainSnapshot {
    let clock = Arc::new(FixedClock(1_700_000_000.0));
    let mut store = ChainStore::with_genesis(1_700_000_000.0, 1, clock).expect("genesis");
    while store.len() < len {
        store.submit_transaction("alice", "bob", store.len() as i64);
        let link = store.tail_link().expect("tail");
        let mut block = store.draft_block(link);
        let digest = pow::solve(&mut block, 1).expect("solve");
        assert!(validate::integrate(&mut store, block, &digest));
    }
    store.snapshot()
}
