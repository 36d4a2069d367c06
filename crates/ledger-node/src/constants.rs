pub(crate) const DEFAULT_HOST: &str = "localhost";
pub(crate) const DEFAULT_PORT: u16 = 5000;
pub(crate) const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 60;
pub(crate) const DEFAULT_BACKUP_KEEP: usize = 10;
pub(crate) const DEFAULT_PEER_TIMEOUT_SECS: u64 = 10;

pub(crate) const MSG_CORRUPT: &str = "The network's blockchain is corrupt";
pub(crate) const MSG_MINED: &str = "New block mined";
pub(crate) const MSG_REPLACED: &str =
    "There was a conflict. This chain has been updated with a longer version";
pub(crate) const MSG_EMPTY_POOL: &str =
    "It is not possible to create a new block. There are no transactions";
