use crate::BackupRecord;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub fn backup_file_name(host: &str, port: u16) -> String {
    format!("backup-node{host}-{port}.json")
}

/// Overwrite the node's JSON backup file in `dir`.
pub fn write_json_backup(dir: &Path, host: &str, port: u16, record: &BackupRecord) -> Result<PathBuf> {
    let path = dir.join(backup_file_name(host, port));
    let bytes = serde_json::to_vec(record)?;
    fs::write(&path, bytes).with_context(|| format!("write backup {}", path.display()))?;
    Ok(path)
}

pub fn read_json_backup(path: &Path) -> Result<BackupRecord> {
    let bytes = fs::read(path).with_context(|| format!("read backup {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("decode backup {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_matches_node_identity() {
        assert_eq!(backup_file_name("localhost", 5000), "backup-nodelocalhost-5000.json");
    }
}
