//! Error types for the ledger engine.

use thiserror::Error;

/// A block that cannot be turned into canonical digest input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalError {
    #[error("non-finite number in `{field}`")]
    NonFinite { field: &'static str },

    #[error("canonical encoding failed: {0}")]
    Encode(String),
}

/// A reported chain that failed local re-validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("block at position {position} failed re-validation: {reason}")]
pub struct ReconstructionError {
    pub position: usize,
    pub reason: String,
}

impl ReconstructionError {
    pub fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("malformed payload: {0}")]
    Schema(String),

    #[error("chain reported by {origin} is corrupt: {source}")]
    ChainCorrupt {
        origin: String,
        #[source]
        source: ReconstructionError,
    },

    #[error("chain has no committed blocks")]
    EmptyChain,

    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error("block {index} was rejected at integration")]
    BlockRejected { index: u64 },

    #[error("proof space exhausted for block {index}")]
    ProofSpaceExhausted { index: u64 },

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// Failure talking to a peer. Consensus skips the peer on any of these.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("peer {peer} answered with status {status}")]
    Status { peer: String, status: u16 },

    #[error("peer {peer} sent an undecodable chain: {reason}")]
    Decode { peer: String, reason: String },
}
