//! Ledger engine: blocks, hash chaining, proof-of-work, integration rules and
//! longest-chain consensus between peer nodes.

pub mod canonical;
pub mod chain;
pub mod clock;
pub mod consensus;
pub mod constants;
pub mod engine;
pub mod error;
pub mod mine;
pub mod peers;
pub mod validate;
pub mod wire;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use chain::ChainStore;
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use consensus::{PeerTransport, Resolution};
pub use engine::{Ledger, LedgerConfig, MineOutcome, MinedBlock};
pub use error::{CanonicalError, LedgerError, PeerError, ReconstructionError};
pub use peers::PeerRegistry;
pub use validate::ProofCheck;
pub use wire::{ChainSnapshot, NewTransaction, ReportedChain};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub origin: String,
    pub destination: String,
    pub amount: i64,
    pub time: f64,
}

/// Link from a block to its predecessor.
///
/// Every block but the genesis carries the sealed digest of the block before
/// it. The genesis block carries the integer `1` instead, and both shapes are
/// kept as-is on the wire and in the digest input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviousHash {
    Sentinel(u64),
    Digest(String),
}

impl PreviousHash {
    pub fn genesis() -> Self {
        PreviousHash::Sentinel(constants::GENESIS_PREVIOUS_HASH)
    }

    pub fn as_digest(&self) -> Option<&str> {
        match self {
            PreviousHash::Digest(d) => Some(d),
            PreviousHash::Sentinel(_) => None,
        }
    }
}

impl From<String> for PreviousHash {
    fn from(digest: String) -> Self {
        PreviousHash::Digest(digest)
    }
}

impl fmt::Display for PreviousHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviousHash::Sentinel(n) => write!(f, "{n}"),
            PreviousHash::Digest(d) => f.write_str(d),
        }
    }
}

/// A candidate or committed block.
///
/// `hash` stays `None` until the block is integrated into a chain; it is never
/// part of its own digest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    hash: Option<String>,
    pub previous_hash: PreviousHash,
    pub index: u64,
    pub proof: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        timestamp: f64,
        previous_hash: PreviousHash,
    ) -> Self {
        Self {
            hash: None,
            previous_hash,
            index,
            proof: 0,
            timestamp,
            transactions,
        }
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn is_sealed(&self) -> bool {
        self.hash.is_some()
    }

    /// Digest of the block at its current proof.
    pub fn calculate_hash(&self) -> Result<String, CanonicalError> {
        self.hash_with_proof(self.proof)
    }

    /// Digest the block would have if its proof were `proof`.
    pub fn hash_with_proof(&self, proof: u64) -> Result<String, CanonicalError> {
        let bytes = canonical::digest_input(self, proof)?;
        Ok(canonical::sha256_hex(&bytes))
    }

    pub(crate) fn seal(&mut self, digest: String) {
        self.hash = Some(digest);
    }
}

pub mod pow {
    use super::Block;
    use crate::error::CanonicalError;

    /// True when the first `difficulty` characters of `digest` are all `'0'`.
    pub fn meets_difficulty(digest: &str, difficulty: usize) -> bool {
        digest.len() >= difficulty && digest.bytes().take(difficulty).all(|b| b == b'0')
    }

    /// Increment `block.proof` until its digest meets `difficulty` and return
    /// that digest. The block is left unsealed.
    pub fn solve(block: &mut Block, difficulty: usize) -> Result<String, CanonicalError> {
        let mut digest = block.calculate_hash()?;
        while !meets_difficulty(&digest, difficulty) {
            block.proof = block.proof.wrapping_add(1);
            digest = block.calculate_hash()?;
        }
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(origin: &str, destination: &str, amount: i64, time: f64) -> Transaction {
        Transaction {
            origin: origin.to_string(),
            destination: destination.to_string(),
            amount,
            time,
        }
    }

    fn sample_block() -> Block {
        Block::new(
            2,
            vec![
                tx("Alice", "Bob", 10, 1_600_000_000.25),
                tx("Bob", "Charlie", 5, 1_600_000_100.5),
            ],
            1_600_000_200.75,
            PreviousHash::Digest("00ab".repeat(16)),
        )
    }

    #[test]
    fn meets_difficulty_examples() {
        assert!(pow::meets_difficulty("0000abcd", 4));
        assert!(!pow::meets_difficulty("000abcde", 4));
        assert!(pow::meets_difficulty("abc", 0));
        assert!(!pow::meets_difficulty("00", 4));
    }

    #[test]
    fn solve_example() {
        let mut block = sample_block();
        let digest = pow::solve(&mut block, 2).unwrap();
        assert!(digest.starts_with("00"));
        assert_eq!(block.calculate_hash().unwrap(), digest);
        assert!(!block.is_sealed());
    }

    #[test]
    fn solve_is_leftmost_proof() {
        let mut block = sample_block();
        let digest = pow::solve(&mut block, 1).unwrap();
        for proof in 0..block.proof {
            let earlier = block.hash_with_proof(proof).unwrap();
            assert!(!pow::meets_difficulty(&earlier, 1));
        }
        assert_eq!(block.hash_with_proof(block.proof).unwrap(), digest);
    }

    #[test]
    fn block_hash_consistency() {
        let block = sample_block();
        let hash1 = block.calculate_hash().unwrap();
        let hash2 = block.calculate_hash().unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), constants::HASH_HEX_SIZE);
    }

    #[test]
    fn sealing_does_not_change_digest() {
        let mut block = sample_block();
        let before = block.calculate_hash().unwrap();
        block.seal(before.clone());
        assert_eq!(block.calculate_hash().unwrap(), before);
    }

    #[test]
    fn block_hash_changes_with_proof() {
        let mut block = sample_block();
        let hash1 = block.calculate_hash().unwrap();
        block.proof += 1;
        let hash2 = block.calculate_hash().unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn block_hash_changes_with_transactions() {
        let block = sample_block();
        let mut tampered = block.clone();
        tampered.transactions[0].amount = 1_000;
        assert_ne!(
            block.calculate_hash().unwrap(),
            tampered.calculate_hash().unwrap()
        );
    }

    #[test]
    fn transaction_equality_example() {
        let tx1 = tx("Alice", "Bob", 10, 1_600_000_000.0);
        let tx2 = tx("Alice", "Bob", 10, 1_600_000_000.0);
        let tx3 = tx("Alice", "Charlie", 10, 1_600_000_000.0);
        assert_eq!(tx1, tx2);
        assert_ne!(tx1, tx3);
    }

    #[test]
    fn transaction_serialization_example() {
        let t = tx("Alice", "Bob", 10, 1_600_000_000.5);
        let json = serde_json::to_string(&t).unwrap();
        let expected_json =
            r#"{"origin":"Alice","destination":"Bob","amount":10,"time":1600000000.5}"#;
        assert_eq!(json, expected_json);
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(t, deserialized);
    }

    #[test]
    fn previous_hash_wire_shapes() {
        assert_eq!(serde_json::to_string(&PreviousHash::genesis()).unwrap(), "1");
        let digest: PreviousHash = serde_json::from_str(r#""00ff""#).unwrap();
        assert_eq!(digest.as_digest(), Some("00ff"));
        let sentinel: PreviousHash = serde_json::from_str("1").unwrap();
        assert_eq!(sentinel, PreviousHash::genesis());
        assert_eq!(sentinel.as_digest(), None);
    }

    #[test]
    fn block_serialization_example() {
        let block = sample_block();
        let json = serde_json::to_value(&block).unwrap();
        assert!(json["hash"].is_null());
        assert_eq!(json["index"], 2);
        let deserialized: Block = serde_json::from_value(json).unwrap();
        assert_eq!(block, deserialized);
    }
}
