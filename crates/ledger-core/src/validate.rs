//! Integrity checks applied before a block joins a chain.

use crate::chain::ChainStore;
use crate::pow::meets_difficulty;
use crate::Block;
use tracing::debug;

/// Outcome of checking a claimed digest against a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofCheck {
    Valid,
    /// The digest does not match the block or is not difficult enough.
    InvalidProof,
    /// The block could not be digested at all.
    MalformedInput,
}

impl ProofCheck {
    pub fn is_valid(self) -> bool {
        self == ProofCheck::Valid
    }
}

pub fn check_proof(block: &Block, candidate: &str, difficulty: usize) -> ProofCheck {
    match block.calculate_hash() {
        Err(_) => ProofCheck::MalformedInput,
        Ok(digest) if digest == candidate && meets_difficulty(candidate, difficulty) => {
            ProofCheck::Valid
        }
        Ok(_) => ProofCheck::InvalidProof,
    }
}

/// True when `candidate` is the block's recomputed digest.
pub fn digest_matches(block: &Block, candidate: &str) -> bool {
    block
        .calculate_hash()
        .map(|digest| digest == candidate)
        .unwrap_or(false)
}

pub fn valid_proof(block: &Block, candidate: &str, difficulty: usize) -> bool {
    check_proof(block, candidate, difficulty).is_valid()
}

/// Seal `block` with `candidate` and append it to `store`.
///
/// Returns false and leaves the store untouched when the block does not link
/// to the current tail or the proof does not hold.
pub fn integrate(store: &mut ChainStore, mut block: Block, candidate: &str) -> bool {
    let tail_hash = store.tail().ok().and_then(Block::hash);
    let linked = match (block.previous_hash.as_digest(), tail_hash) {
        (Some(prev), Some(tail)) => prev == tail,
        _ => false,
    };
    if !linked {
        debug!(index = block.index, "rejecting block: does not link to tail");
        return false;
    }

    match check_proof(&block, candidate, store.difficulty()) {
        ProofCheck::Valid => {
            block.seal(candidate.to_owned());
            store.append_sealed(block);
            true
        }
        check => {
            debug!(index = block.index, ?check, "rejecting block");
            false
        }
    }
}
