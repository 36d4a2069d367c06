use crate::error::{CanonicalError, LedgerError};
use crate::pow::meets_difficulty;
use crate::Block;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Proofs handed to the rayon pool per round of [`solve_parallel`].
pub const PARALLEL_WINDOW: u64 = 1 << 14;

/// Searches proofs in parallel and settles on the same proof the sequential
/// [`crate::pow::solve`] would find: the smallest one at or above the block's
/// current proof. Sets `block.proof` and returns the digest; the block is left
/// unsealed.
pub fn solve_parallel(block: &mut Block, difficulty: usize) -> Result<String, LedgerError> {
    solve_windowed(block, difficulty, PARALLEL_WINDOW)
}

/// Splits the proof range into consecutive windows of `window` proofs and
/// searches each one on every core before moving to the next.
pub(crate) fn solve_windowed(
    block: &mut Block,
    difficulty: usize,
    window: u64,
) -> Result<String, LedgerError> {
    // Also surfaces a block that cannot be digested before fanning out.
    let digest = block.calculate_hash()?;
    if meets_difficulty(&digest, difficulty) {
        return Ok(digest);
    }

    let window = window.max(1);
    let mut base = block.proof.saturating_add(1);
    let proof = loop {
        let end = base.saturating_add(window);
        let template: &Block = block;
        let found = (base..end).into_par_iter().find_first(|proof| {
            template
                .hash_with_proof(*proof)
                .map(|d| meets_difficulty(&d, difficulty))
                .unwrap_or(false)
        });
        if let Some(proof) = found {
            break proof;
        }
        if end == u64::MAX {
            return Err(LedgerError::ProofSpaceExhausted { index: block.index });
        }
        base = end;
    };

    block.proof = proof;
    let digest = block.calculate_hash()?;
    info!(index = block.index, proof, %digest, "solved block in parallel");
    Ok(digest)
}

/// Sequential search that gives up as soon as `cancel` is set.
///
/// Returns `Ok(None)` when cancelled; the block's proof is left wherever the
/// search stopped.
pub fn solve_cancellable(
    block: &mut Block,
    difficulty: usize,
    cancel: &AtomicBool,
) -> Result<Option<String>, CanonicalError> {
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(None);
        }
        let digest = block.calculate_hash()?;
        if meets_difficulty(&digest, difficulty) {
            return Ok(Some(digest));
        }
        block.proof = block.proof.wrapping_add(1);
    }
}
