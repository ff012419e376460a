//! Shared chain fixture for the integration tests
#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver};
use forgechain::blockchain::{Ancestors, Block, BlockId, BlockOutcome, ChainEngine};
use forgechain::codec::encode_block;
use forgechain::config::ConsensusConfig;
use forgechain::consensus::DifficultyOracle;
use forgechain::crypto::KeyPair;
use forgechain::economics::coinbase_reward;
use forgechain::error::Result;
use forgechain::genesis::create_genesis_block;
use forgechain::inventory::Inventory;
use forgechain::miner::{BlockTemplate, ChainEvent};
use forgechain::transaction::{InEntry, OutEntry, OutPoint, Transaction};
use std::collections::HashMap;
use std::sync::Arc;

pub const GENESIS_TIME: u64 = 1_700_000_000_000;
/// Target block interval; blocks spaced exactly this far apart keep difficulty flat.
pub const SPACING: u64 = 10_000;

pub struct Fixture {
    pub engine: ChainEngine,
    pub genesis: Block,
    /// Owner of the genesis coinbase and every coinbase the fixture builds.
    pub miner: KeyPair,
    pub events: Receiver<ChainEvent>,
    oracle: DifficultyOracle,
    built: HashMap<BlockId, Block>,
    heights: HashMap<BlockId, u64>,
}

impl Fixture {
    /// Engine with a one-interval retarget window, so a branch mined faster
    /// than the target gains difficulty after two blocks.
    pub fn new() -> Self {
        let oracle = DifficultyOracle::new(&ConsensusConfig {
            retarget_window: 1,
            target_block_time_ms: SPACING,
            ..ConsensusConfig::default()
        });
        let miner = KeyPair::generate();
        let genesis = create_genesis_block(miner.address(), GENESIS_TIME, 1.0).unwrap();
        let (sender, events) = unbounded();
        let engine = ChainEngine::new(
            genesis.clone(),
            oracle.clone(),
            Arc::new(Inventory::new()),
            sender,
        )
        .unwrap();

        Fixture {
            engine,
            miner,
            events,
            oracle,
            built: HashMap::from([(genesis.id(), genesis.clone())]),
            heights: HashMap::from([(genesis.id(), 0)]),
            genesis,
        }
    }

    /// Difficulty a child of `parent` must declare.
    pub fn expected_difficulty(&self, parent: &Block) -> f64 {
        let ancestors: Vec<&Block> = Ancestors::new(&self.built, parent.id())
            .take(self.oracle.history_len())
            .collect();
        self.oracle.next_difficulty(&ancestors)
    }

    /// Seals a valid-looking child of `parent`: a coinbase claiming the full
    /// subsidy for the miner, then `transactions`.
    pub fn build(&mut self, parent: &Block, timestamp: u64, transactions: Vec<Transaction>) -> Block {
        let difficulty = self.expected_difficulty(parent);
        self.build_with(parent, timestamp, difficulty, transactions)
    }

    pub fn build_with(
        &mut self,
        parent: &Block,
        timestamp: u64,
        difficulty: f64,
        transactions: Vec<Transaction>,
    ) -> Block {
        let height = self.heights[&parent.id()] + 1;
        let coinbase = Transaction::coinbase(timestamp, self.miner.address(), coinbase_reward(height));
        let mut all = vec![coinbase];
        all.extend(transactions);
        self.seal(parent, timestamp, difficulty, all)
    }

    /// Seals exactly `transactions` (coinbase included) on top of `parent`.
    pub fn seal(
        &mut self,
        parent: &Block,
        timestamp: u64,
        difficulty: f64,
        transactions: Vec<Transaction>,
    ) -> Block {
        let block = BlockTemplate {
            previous_hash: parent.id(),
            timestamp,
            difficulty,
            transactions,
        }
        .seal(10_000_000)
        .unwrap();
        self.heights.insert(block.id(), self.heights[&parent.id()] + 1);
        self.built.insert(block.id(), block.clone());
        block
    }

    /// Builds a chain of `len` blocks on `parent`, `spacing` apart.
    pub fn build_chain(&mut self, parent: &Block, len: usize, spacing: u64) -> Vec<Block> {
        let mut chain = Vec::with_capacity(len);
        let mut tip = parent.clone();
        for _ in 0..len {
            let block = self.build(&tip, tip.timestamp() + spacing, vec![]);
            tip = block.clone();
            chain.push(block);
        }
        chain
    }

    pub fn try_submit(&self, block: &Block) -> Result<BlockOutcome> {
        let payload = encode_block(block)?;
        self.engine.process_block(&payload, &block.previous_hash())
    }

    pub fn submit(&self, block: &Block) -> BlockOutcome {
        self.try_submit(block).unwrap()
    }

    pub fn drain_events(&self) -> Vec<ChainEvent> {
        self.events.try_iter().collect()
    }
}

/// The coinbase output of `block`.
pub fn coinbase_outpoint(block: &Block) -> OutPoint {
    OutPoint::new(block.header.transaction_ids[0], 0)
}

/// A transaction spending `inputs`, all owned by `owner`, into `outputs`.
pub fn transfer(owner: &KeyPair, inputs: &[OutPoint], timestamp: u64, outputs: Vec<OutEntry>) -> Transaction {
    let in_entries = inputs.iter().copied().map(InEntry::unsigned).collect();
    let mut tx = Transaction::new(timestamp, in_entries, outputs);
    tx.sign_inputs(owner);
    tx
}
