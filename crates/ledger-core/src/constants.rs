pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Leading `'0'` hex characters a sealed block's digest must carry.
pub const DEFAULT_DIFFICULTY: usize = 4;
/// Index carried by the genesis block.
pub const GENESIS_INDEX: u64 = 1;
/// `previous_hash` of the genesis block. An integer, not a digest.
pub const GENESIS_PREVIOUS_HASH: u64 = 1;
/// Origin used for the optional miner reward transaction.
pub const REWARD_ORIGIN: &str = "0";
