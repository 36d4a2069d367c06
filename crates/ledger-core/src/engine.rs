//! The ledger object shared by request handlers.
//!
//! Every mutation of the chain runs under one exclusive lock, and `mine` holds
//! it across the whole resolve → draft → solve → integrate sequence, proof
//! search included. Submissions wait while a block is being mined.

use crate::chain::ChainStore;
use crate::clock::SharedClock;
use crate::consensus::{self, PeerTransport, Resolution};
use crate::constants::{DEFAULT_DIFFICULTY, REWARD_ORIGIN};
use crate::error::LedgerError;
use crate::peers::{normalize, PeerRegistry};
use crate::wire::{ChainSnapshot, NewTransaction, ReportedChain};
use crate::{mine, pow, validate, PreviousHash, Transaction};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, RwLock};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Address peers use to reach this node; excluded from consensus.
    pub self_address: String,
    pub difficulty: usize,
    /// Search proofs on the rayon pool instead of the calling thread.
    pub parallel_pow: bool,
    /// Amount paid to `self_address` in every mined block, if any.
    pub miner_reward: Option<i64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            self_address: "http://localhost:5000".to_string(),
            difficulty: DEFAULT_DIFFICULTY,
            parallel_pow: false,
            miner_reward: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MinedBlock {
    pub block_hash: String,
    pub previous_hash: PreviousHash,
    pub index: u64,
    pub proof: u64,
    pub transactions: Vec<Transaction>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MineOutcome {
    Mined(MinedBlock),
    /// A longer peer chain replaced ours; nothing was drafted.
    ChainReplaced,
    /// The pending pool was empty.
    NothingToMine,
}

pub struct Ledger<T> {
    chain: Mutex<ChainStore>,
    peers: RwLock<PeerRegistry>,
    transport: T,
    clock: SharedClock,
    config: LedgerConfig,
}

impl<T: PeerTransport> Ledger<T> {
    pub fn new(mut config: LedgerConfig, transport: T, clock: SharedClock) -> Result<Self, LedgerError> {
        if let Some(address) = normalize(&config.self_address) {
            config.self_address = address;
        }
        let now = clock.now();
        let store = ChainStore::with_genesis(now, config.difficulty, clock.clone())?;
        Ok(Self {
            chain: Mutex::new(store),
            peers: RwLock::new(PeerRegistry::new()),
            transport,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChainStore>, LedgerError> {
        self.chain.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    pub fn submit_transaction(
        &self,
        origin: impl Into<String>,
        destination: impl Into<String>,
        amount: i64,
    ) -> Result<u64, LedgerError> {
        let mut chain = self.lock()?;
        Ok(chain.submit_transaction(origin, destination, amount))
    }

    pub fn submit(&self, tx: NewTransaction) -> Result<u64, LedgerError> {
        self.submit_transaction(tx.origin, tx.destination, tx.amount)
    }

    /// Run consensus against the known peers, then mine the pending pool.
    pub fn mine(&self) -> Result<MineOutcome, LedgerError> {
        let peers = self.remote_peers()?;
        let mut chain = self.lock()?;

        match consensus::resolve(
            &mut chain,
            peers.iter().map(String::as_str),
            &self.config.self_address,
            &self.transport,
        ) {
            Resolution::Corrupt(c) => {
                return Err(LedgerError::ChainCorrupt {
                    origin: c.peer,
                    source: c.error,
                })
            }
            Resolution::Replaced => return Ok(MineOutcome::ChainReplaced),
            Resolution::Unchanged => {}
        }

        if chain.pending().is_empty() {
            return Ok(MineOutcome::NothingToMine);
        }

        let reward_index = self
            .config
            .miner_reward
            .map(|amount| chain.submit_transaction(REWARD_ORIGIN, self.config.self_address.clone(), amount));

        let previous_hash = chain.tail_link()?;
        let mut block = chain.draft_block(previous_hash.clone());
        let digest = if self.config.parallel_pow {
            mine::solve_parallel(&mut block, chain.difficulty())?
        } else {
            pow::solve(&mut block, chain.difficulty())?
        };

        let index = block.index;
        let mined = MinedBlock {
            block_hash: digest.clone(),
            previous_hash,
            index: reward_index.unwrap_or(index),
            proof: block.proof,
            transactions: block.transactions.clone(),
        };
        if !validate::integrate(&mut chain, block, &digest) {
            warn!(index, "freshly mined block was rejected");
            return Err(LedgerError::BlockRejected { index });
        }
        info!(index, proof = mined.proof, hash = %digest, "mined block");
        Ok(MineOutcome::Mined(mined))
    }

    /// Run consensus against the known peers.
    pub fn resolve(&self) -> Result<Resolution, LedgerError> {
        let peers = self.remote_peers()?;
        self.resolve_with(peers.iter().map(String::as_str))
    }

    pub fn resolve_with<'a, I>(&self, peers: I) -> Result<Resolution, LedgerError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut chain = self.lock()?;
        Ok(consensus::resolve(
            &mut chain,
            peers,
            &self.config.self_address,
            &self.transport,
        ))
    }

    /// Replace the local chain with `reported` if every block re-validates,
    /// regardless of length. Used when another node pushes its chain to us.
    pub fn adopt(&self, origin: &str, reported: &ReportedChain) -> Result<usize, LedgerError> {
        let mut chain = self.lock()?;
        let mut store = consensus::reconstruct(reported, chain.difficulty(), self.clock.clone())
            .map_err(|source| LedgerError::ChainCorrupt {
                origin: origin.to_owned(),
                source,
            })?;
        store.restore_pending(chain.take_pending());
        *chain = store;
        info!(%origin, length = chain.len(), "adopted chain");
        Ok(chain.len())
    }

    pub fn snapshot(&self) -> Result<ChainSnapshot, LedgerError> {
        Ok(self.lock()?.snapshot())
    }

    /// Run `f` against the chain while holding the ledger lock.
    pub fn with_chain<R>(&self, f: impl FnOnce(&ChainStore) -> R) -> Result<R, LedgerError> {
        let chain = self.lock()?;
        Ok(f(&chain))
    }

    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.lock()?.len())
    }

    /// Replace the known peers, returning those other than this node.
    pub fn register_peers<I, S>(&self, addresses: I) -> Result<Vec<String>, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut peers = self.peers.write().map_err(|_| LedgerError::LockPoisoned)?;
        peers.replace(addresses);
        Ok(peers.without(&self.config.self_address))
    }

    pub fn extend_peers<I, S>(&self, addresses: I) -> Result<usize, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut peers = self.peers.write().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(peers.extend(addresses))
    }

    pub fn remove_peer(&self, address: &str) -> Result<bool, LedgerError> {
        let mut peers = self.peers.write().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(peers.remove(address))
    }

    /// Every known peer address, this node's included if registered.
    pub fn peers(&self) -> Result<Vec<String>, LedgerError> {
        let peers = self.peers.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(peers.iter().map(str::to_owned).collect())
    }

    pub fn remote_peers(&self) -> Result<Vec<String>, LedgerError> {
        let peers = self.peers.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(peers.without(&self.config.self_address))
    }
}
