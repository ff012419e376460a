//! Interface to the mining side: head-change notifications and block sealing

use crate::blockchain::{short_id, Block, BlockHeader, BlockId};
use crate::codec::encode_transaction;
use crate::consensus::DifficultyOracle;
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Something that builds blocks on top of the current head.
///
/// `restart` is advisory: it tells the miner its in-progress work is stale.
/// It must be cheap and idempotent.
pub trait MiningController: Send + Sync {
    fn restart(&self);
}

/// Emitted by the chain engine after every committed head change.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    HeadChanged { head: BlockId, height: u64 },
}

/// Forwards chain events to a [`MiningController`] on a dedicated thread.
///
/// The engine only ever sends into an unbounded channel, so a slow miner
/// never holds up block ingestion. Bursts of head changes (a reorg emits
/// one per block) collapse into a single restart.
#[derive(Debug)]
pub struct RestartDispatcher {
    handle: JoinHandle<u64>,
}

impl RestartDispatcher {
    pub fn spawn(events: Receiver<ChainEvent>, controller: Arc<dyn MiningController>) -> Self {
        let handle = thread::spawn(move || {
            let mut restarts = 0u64;
            while let Ok(ChainEvent::HeadChanged { head, height }) = events.recv() {
                let mut latest = (head, height);
                for ChainEvent::HeadChanged { head, height } in events.try_iter() {
                    latest = (head, height);
                }
                debug!(head = %short_id(&latest.0), height = latest.1, "restarting miner");
                controller.restart();
                restarts += 1;
            }
            info!(restarts, "chain event channel closed, dispatcher stopping");
            restarts
        });
        RestartDispatcher { handle }
    }

    /// Waits for every sender to hang up; returns how many restarts were issued.
    pub fn join(self) -> u64 {
        self.handle.join().unwrap_or(0)
    }
}

/// Contents of a block still waiting for a nonce.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub previous_hash: BlockId,
    pub timestamp: u64,
    pub difficulty: f64,
    /// Coinbase first, then ordinary transactions.
    pub transactions: Vec<Transaction>,
}

impl BlockTemplate {
    /// Searches nonces until the block id proves `difficulty`.
    pub fn seal(&self, max_attempts: u64) -> Result<Block> {
        let transaction_ids: Vec<_> = self.transactions.iter().map(|tx| tx.id()).collect();
        let payloads = self
            .transactions
            .iter()
            .map(encode_transaction)
            .collect::<Result<Vec<_>>>()?;

        let mut header = BlockHeader {
            previous_hash: self.previous_hash,
            timestamp: self.timestamp,
            difficulty: self.difficulty,
            nonce: 0,
            transaction_root: Block::calculate_merkle_root(&transaction_ids),
            transaction_ids,
        };

        for nonce in 0..max_attempts {
            header.nonce = nonce;
            if DifficultyOracle::difficulty_of(&header.hash()) >= self.difficulty {
                return Ok(Block::new(header, payloads));
            }
        }
        Err(ChainError::SealExhausted {
            difficulty: self.difficulty,
            attempts: max_attempts,
        })
    }
}
