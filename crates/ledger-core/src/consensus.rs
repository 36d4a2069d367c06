//! Longest-chain consensus between peers.
//!
//! A peer chain only wins if it is strictly longer than everything seen so far
//! and every block in it re-validates when integrated one by one into a fresh
//! local store. The first chain that fails re-validation aborts the pass.

use crate::chain::ChainStore;
use crate::clock::SharedClock;
use crate::error::{PeerError, ReconstructionError};
use crate::peers::normalize;
use crate::validate;
use crate::wire::{self, ReportedChain};
use tracing::{debug, info, warn};

/// Fetches a peer's full chain.
pub trait PeerTransport: Send + Sync {
    fn fetch_chain(&self, peer: &str) -> Result<ReportedChain, PeerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptChain {
    pub peer: String,
    pub error: ReconstructionError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unchanged,
    Replaced,
    Corrupt(CorruptChain),
}

/// Rebuild a reported chain locally.
///
/// Only the genesis timestamp is taken from element 0; every later block must
/// pass [`validate::integrate`] in order.
pub fn reconstruct(
    reported: &ReportedChain,
    difficulty: usize,
    clock: SharedClock,
) -> Result<ChainStore, ReconstructionError> {
    let genesis = reported
        .chain
        .first()
        .ok_or_else(|| ReconstructionError::new(0, "chain has no genesis block"))?;
    let genesis_time =
        wire::genesis_timestamp(genesis).map_err(|e| ReconstructionError::new(0, e.to_string()))?;
    let mut store = ChainStore::with_genesis(genesis_time, difficulty, clock)
        .map_err(|e| ReconstructionError::new(0, e.to_string()))?;

    for (position, value) in reported.chain.iter().enumerate().skip(1) {
        let (block, claimed) = wire::parse_reported_block(value)
            .map_err(|e| ReconstructionError::new(position, e.to_string()))?;
        let claimed =
            claimed.ok_or_else(|| ReconstructionError::new(position, "block is not sealed"))?;
        if !validate::integrate(&mut store, block, &claimed) {
            return Err(ReconstructionError::new(
                position,
                "hash, proof or link does not verify",
            ));
        }
    }
    Ok(store)
}

/// Compare `local` with every peer except `self_address` and adopt the
/// longest valid chain that beats it.
///
/// Unreachable peers are skipped. Pending transactions of `local` are carried
/// over into a replacement.
pub fn resolve<'a, T, I>(
    local: &mut ChainStore,
    peers: I,
    self_address: &str,
    transport: &T,
) -> Resolution
where
    T: PeerTransport + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let own = normalize(self_address);
    let local_len = local.len();
    let mut best: Option<ChainStore> = None;

    for peer in peers {
        if normalize(peer) == own {
            continue;
        }
        let reported = match transport.fetch_chain(peer) {
            Ok(reported) => reported,
            Err(err) => {
                warn!(%peer, error = %err, "skipping peer");
                continue;
            }
        };
        if reported.len() <= local_len {
            debug!(%peer, length = reported.len(), local_len, "peer chain is not longer");
            continue;
        }

        let candidate = match reconstruct(&reported, local.difficulty(), local.clock().clone()) {
            Ok(candidate) => candidate,
            Err(error) => {
                warn!(%peer, %error, "peer reported a corrupt chain");
                return Resolution::Corrupt(CorruptChain {
                    peer: peer.to_owned(),
                    error,
                });
            }
        };
        let best_len = best.as_ref().map_or(local_len, ChainStore::len);
        if candidate.len() > best_len {
            debug!(%peer, length = candidate.len(), "new best candidate");
            best = Some(candidate);
        }
    }

    match best {
        Some(mut winner) => {
            winner.restore_pending(local.take_pending());
            info!(from = local_len, to = winner.len(), "replaced local chain");
            *local = winner;
            Resolution::Replaced
        }
        None => Resolution::Unchanged,
    }
}
