use crate::constants::{
    DEFAULT_BACKUP_INTERVAL_SECS, DEFAULT_BACKUP_KEEP, DEFAULT_HOST, DEFAULT_PEER_TIMEOUT_SECS,
    DEFAULT_PORT,
};
use anyhow::{Context, Result};
use clap::Parser;
use ledger_core::constants::{DEFAULT_DIFFICULTY, HASH_HEX_SIZE};
use ledger_core::LedgerConfig;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger node")]
pub struct NodeArgs {
    /// Host name peers use to reach this node
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// IP address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub listen: IpAddr,

    /// Data directory for sled
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Directory the JSON backup file is written to
    #[arg(long, default_value = ".")]
    pub backup_dir: PathBuf,

    /// Seconds between backups
    #[arg(long, default_value_t = DEFAULT_BACKUP_INTERVAL_SECS)]
    pub backup_interval_secs: u64,

    /// Number of backups kept in sled
    #[arg(long, default_value_t = DEFAULT_BACKUP_KEEP)]
    pub backup_keep: usize,

    /// Per-request timeout when talking to peers
    #[arg(long, default_value_t = DEFAULT_PEER_TIMEOUT_SECS)]
    pub peer_timeout_secs: u64,

    /// Leading zero hex characters required of block hashes
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    pub difficulty: usize,

    /// Search proofs on all cores
    #[arg(long)]
    pub parallel_pow: bool,

    /// Pay this amount to the node in every block it mines
    #[arg(long)]
    pub miner_reward: Option<i64>,

    /// Adopt the latest sled backup at startup
    #[arg(long)]
    pub restore: bool,
}

impl NodeArgs {
    pub fn self_address(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    pub fn backup_interval(&self) -> Result<Duration> {
        if self.backup_interval_secs == 0 {
            anyhow::bail!("--backup-interval-secs must be positive");
        }
        Ok(Duration::from_secs(self.backup_interval_secs))
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            self_address: self.self_address(),
            difficulty: self.difficulty,
            parallel_pow: self.parallel_pow,
            miner_reward: self.miner_reward,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.backup_interval()?;
        if self.difficulty > HASH_HEX_SIZE {
            anyhow::bail!("--difficulty cannot exceed {HASH_HEX_SIZE}");
        }
        std::fs::create_dir_all(&self.backup_dir)
            .with_context(|| format!("create backup dir {}", self.backup_dir.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_node() {
        let args = NodeArgs::parse_from(["ledger-node"]);
        assert_eq!(args.port, 5000);
        assert_eq!(args.self_address(), "http://localhost:5000");
        assert_eq!(args.difficulty, 4);
        assert_eq!(args.backup_interval().unwrap(), Duration::from_secs(60));
        assert!(!args.parallel_pow);
        assert_eq!(args.miner_reward, None);
    }

    #[test]
    fn flags_flow_into_ledger_config() {
        let args = NodeArgs::parse_from([
            "ledger-node",
            "-p",
            "5001",
            "--host",
            "10.0.0.2",
            "--parallel-pow",
            "--miner-reward",
            "1",
            "--difficulty",
            "3",
        ]);
        let config = args.ledger_config();
        assert_eq!(config.self_address, "http://10.0.0.2:5001");
        assert_eq!(config.difficulty, 3);
        assert!(config.parallel_pow);
        assert_eq!(config.miner_reward, Some(1));
        assert_eq!(args.bind_addr().port(), 5001);
    }

    #[test]
    fn zero_backup_interval_is_rejected() {
        let args = NodeArgs::parse_from(["ledger-node", "--backup-interval-secs", "0"]);
        assert!(args.backup_interval().is_err());
    }
}
