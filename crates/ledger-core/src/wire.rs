//! JSON documents exchanged between nodes and with clients.

use crate::error::LedgerError;
use crate::{Block, PreviousHash, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node's committed chain as served on `/chain`.
///
/// `chain` lists only sealed blocks while `length` counts every block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// A chain as reported by a peer, before any validation.
///
/// Blocks stay as raw JSON so that one malformed block is a corruption of the
/// chain rather than an unreadable response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedChain {
    pub chain: Vec<Value>,
    #[serde(default)]
    pub length: Option<usize>,
}

impl ReportedChain {
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl From<&ChainSnapshot> for ReportedChain {
    fn from(snapshot: &ChainSnapshot) -> Self {
        Self {
            chain: snapshot
                .chain
                .iter()
                .map(|b| serde_json::to_value(b).unwrap_or(Value::Null))
                .collect(),
            length: Some(snapshot.length),
        }
    }
}

#[derive(Deserialize)]
struct ReportedBlock {
    #[serde(default)]
    hash: Option<String>,
    previous_hash: PreviousHash,
    index: u64,
    proof: u64,
    timestamp: f64,
    transactions: Vec<Transaction>,
}

/// Split a reported block into an unsealed candidate and its claimed digest.
pub(crate) fn parse_reported_block(value: &Value) -> Result<(Block, Option<String>), LedgerError> {
    let reported = ReportedBlock::deserialize(value)
        .map_err(|e| LedgerError::Schema(format!("block: {e}")))?;
    let mut block = Block::new(
        reported.index,
        reported.transactions,
        reported.timestamp,
        reported.previous_hash,
    );
    block.proof = reported.proof;
    Ok((block, reported.hash))
}

/// Only the timestamp of a reported genesis block is consumed.
pub(crate) fn genesis_timestamp(value: &Value) -> Result<f64, LedgerError> {
    value
        .get("timestamp")
        .and_then(Value::as_f64)
        .ok_or_else(|| LedgerError::Schema("genesis block has no numeric timestamp".into()))
}

/// A client's transaction submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub origin: String,
    pub destination: String,
    pub amount: i64,
}

impl NewTransaction {
    /// Check that `origin`, `destination` and `amount` are all present and
    /// well-typed.
    pub fn from_json(value: &Value) -> Result<Self, LedgerError> {
        let missing: Vec<&str> = ["origin", "destination", "amount"]
            .into_iter()
            .filter(|k| value.get(k).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(LedgerError::Schema(format!(
                "missing values: {}",
                missing.join(", ")
            )));
        }
        Self::deserialize(value).map_err(|e| LedgerError::Schema(e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub node_addresses: Vec<String>,
}

/// Pushed by a registering node so the receiver adopts its peers and chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub node_addresses: Vec<String>,
    pub blockchain: Vec<Value>,
}

impl SyncRequest {
    pub fn reported_chain(&self) -> ReportedChain {
        ReportedChain {
            chain: self.blockchain.clone(),
            length: Some(self.blockchain.len()),
        }
    }
}
