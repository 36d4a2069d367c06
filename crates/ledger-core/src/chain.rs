use crate::clock::SharedClock;
use crate::constants::{DEFAULT_DIFFICULTY, GENESIS_INDEX};
use crate::error::LedgerError;
use crate::wire::ChainSnapshot;
use crate::{Block, PreviousHash, Transaction};
use std::fmt;

/// Ordered committed blocks plus the pool of transactions waiting for one.
///
/// A store always holds at least its genesis block. Blocks are only ever
/// appended through [`crate::validate::integrate`]; the whole store is
/// replaced, never edited, when a longer peer chain wins.
#[derive(Clone)]
pub struct ChainStore {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    pending_index: u64,
    difficulty: usize,
    clock: SharedClock,
}

impl ChainStore {
    /// A store whose genesis block is stamped with the clock's current time.
    pub fn new(clock: SharedClock) -> Result<Self, LedgerError> {
        let now = clock.now();
        Self::with_genesis(now, DEFAULT_DIFFICULTY, clock)
    }

    /// A store whose genesis block carries `genesis_time`, as when rebuilding
    /// a peer's chain.
    pub fn with_genesis(
        genesis_time: f64,
        difficulty: usize,
        clock: SharedClock,
    ) -> Result<Self, LedgerError> {
        let mut store = Self {
            blocks: Vec::new(),
            pending: Vec::new(),
            pending_index: GENESIS_INDEX,
            difficulty,
            clock,
        };
        let genesis = store.create_genesis(genesis_time)?;
        store.blocks.push(genesis);
        Ok(store)
    }

    fn create_genesis(&mut self, time: f64) -> Result<Block, LedgerError> {
        let mut genesis = Block::new(GENESIS_INDEX, Vec::new(), time, PreviousHash::genesis());
        let digest = genesis.calculate_hash()?;
        genesis.seal(digest);
        self.pending_index += 1;
        Ok(genesis)
    }

    /// Queue a transaction and return the index of the next block to be
    /// drafted. That block is not guaranteed to be the one that confirms it.
    pub fn submit_transaction(
        &mut self,
        origin: impl Into<String>,
        destination: impl Into<String>,
        amount: i64,
    ) -> u64 {
        self.pending.push(Transaction {
            origin: origin.into(),
            destination: destination.into(),
            amount,
            time: self.clock.now(),
        });
        self.pending_index
    }

    /// Drain the pending pool into a new unsealed block.
    ///
    /// The pool is emptied whether or not the block is later integrated.
    pub fn draft_block(&mut self, previous_hash: PreviousHash) -> Block {
        let transactions = std::mem::take(&mut self.pending);
        let block = Block::new(
            self.pending_index,
            transactions,
            self.clock.now(),
            previous_hash,
        );
        self.pending_index += 1;
        block
    }

    pub fn tail(&self) -> Result<&Block, LedgerError> {
        self.blocks.last().ok_or(LedgerError::EmptyChain)
    }

    /// The link a block drafted on top of the current tail must carry.
    pub fn tail_link(&self) -> Result<PreviousHash, LedgerError> {
        self.tail()?
            .hash()
            .map(|h| PreviousHash::Digest(h.to_owned()))
            .ok_or(LedgerError::EmptyChain)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn pending_index(&self) -> u64 {
        self.pending_index
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self
                .blocks
                .iter()
                .filter(|b| b.is_sealed())
                .cloned()
                .collect(),
            length: self.blocks.len(),
        }
    }

    pub(crate) fn append_sealed(&mut self, block: Block) {
        self.pending_index = self.pending_index.max(block.index.saturating_add(1));
        self.blocks.push(block);
        self.pending.clear();
    }

    pub(crate) fn take_pending(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn restore_pending(&mut self, transactions: Vec<Transaction>) {
        self.pending.extend(transactions);
    }
}

impl fmt::Debug for ChainStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainStore")
            .field("blocks", &self.blocks.len())
            .field("pending", &self.pending.len())
            .field("pending_index", &self.pending_index)
            .field("difficulty", &self.difficulty)
            .finish_non_exhaustive()
    }
}
