use crate::codec::{decode_block, encode_block};
use crate::consensus::DifficultyOracle;
use crate::crypto::Address;
use crate::economics::coinbase_reward;
use crate::error::{ChainError, Result, ValidationError};
use crate::inventory::Inventory;
use crate::mempool::MempoolJournal;
use crate::miner::ChainEvent;
use crate::transaction::{OutPoint, TransactionOutput};
use crossbeam_channel::Sender;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::chain::{lowest_common_ancestor, short_id, Ancestors, Block, BlockId};
use super::state::UtxoSet;
use super::validation::{execute_transactions, parse_transactions, validate_header};

/// What ingesting one block did to the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    /// The block was already known; nothing changed.
    Duplicate,
    /// The parent is unknown; the block waits for it.
    Floating { missing_parent: BlockId },
    /// Linked into the block graph, but its branch is not heavier than the head's.
    Stored { height: u64, total_difficulty: f64 },
    /// Became the head by extending it.
    Extended { height: u64 },
    /// Became the head after replacing the tail of the canonical chain.
    Reorganized {
        fork: BlockId,
        reverted: usize,
        applied: usize,
    },
    /// A block of the candidate branch broke a rule. The chain is exactly as
    /// it was before, and the offending block has been purged.
    Rejected {
        block: BlockId,
        reason: ValidationError,
    },
}

impl BlockOutcome {
    /// True when the block now sits in the block table.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            BlockOutcome::Stored { .. } | BlockOutcome::Extended { .. } | BlockOutcome::Reorganized { .. }
        )
    }
}

struct ChainState {
    blocks: HashMap<BlockId, Block>,
    /// Missing parent id -> blocks that named it as their parent.
    floating: HashMap<BlockId, Vec<BlockId>>,
    utxos: UtxoSet,
    latest: BlockId,
    /// Active only while a reorg is in flight.
    journal: Option<MempoolJournal>,
}

impl ChainState {
    fn head(&self) -> &Block {
        // The head is always a run block and run blocks are never purged.
        &self.blocks[&self.latest]
    }
}

/// Decides the canonical chain and keeps the UTXO set in step with it.
///
/// All chain state sits behind one lock. `process_block` holds it for
/// writing from decoding to the last orphan it resolves, so ingestion and
/// reorgs are serialized and readers never see a half-applied reorg. The
/// mempool lives in [`Inventory`] under its own lock and is only held for
/// the mempool edits of each `apply`/`revert`.
pub struct ChainEngine {
    state: RwLock<ChainState>,
    oracle: DifficultyOracle,
    inventory: Arc<Inventory>,
    events: Sender<ChainEvent>,
}

impl ChainEngine {
    /// Installs `genesis` as the head and credits its coinbase.
    pub fn new(
        mut genesis: Block,
        oracle: DifficultyOracle,
        inventory: Arc<Inventory>,
        events: Sender<ChainEvent>,
    ) -> Result<Self> {
        let header = &genesis.header;
        if genesis.transactions.len() != header.transaction_ids.len() {
            return Err(ValidationError::TransactionCountMismatch {
                ids: header.transaction_ids.len(),
                payloads: genesis.transactions.len(),
            }
            .into());
        }
        let root = Block::calculate_merkle_root(&header.transaction_ids);
        if root != header.transaction_root {
            return Err(ValidationError::MerkleRootMismatch {
                expected: hex::encode(root),
                actual: hex::encode(header.transaction_root),
            }
            .into());
        }

        let mut transactions = parse_transactions(&genesis)?;
        let mut utxos = UtxoSet::new();
        execute_transactions(&mut transactions, &utxos, genesis.timestamp(), coinbase_reward(0))?;
        for info in transactions.iter().filter_map(|tx| tx.exec_info()) {
            utxos.apply(info);
        }

        let id = genesis.id();
        inventory.put_block(id, encode_block(&genesis)?);
        let difficulty = genesis.difficulty();
        genesis.mark_run(0, difficulty, transactions);
        info!(genesis = %short_id(&id), "chain engine initialised");

        Ok(ChainEngine {
            state: RwLock::new(ChainState {
                blocks: HashMap::from([(id, genesis)]),
                floating: HashMap::new(),
                utxos,
                latest: id,
                journal: None,
            }),
            oracle,
            inventory,
            events,
        })
    }

    /// Ingests a raw block whose parent is claimed to be `parent_id`.
    ///
    /// Malformed bytes and a claimed parent that disagrees with the header
    /// are returned as errors and leave the engine untouched. Everything
    /// else, rule violations included, is reported as a [`BlockOutcome`].
    pub fn process_block(&self, data: &[u8], parent_id: &BlockId) -> Result<BlockOutcome> {
        let block = decode_block(data)?;
        if block.previous_hash() != *parent_id {
            return Err(ValidationError::WrongParent {
                expected: hex::encode(parent_id),
                actual: hex::encode(block.previous_hash()),
            }
            .into());
        }

        let id = block.id();
        let mut state = self.state.write();
        // Stored under the chain lock so no purge runs between storing and ingesting.
        self.inventory.put_block(id, data.to_vec());
        let outcome = self.ingest(&mut state, block);
        if outcome.is_connected() {
            self.check_floating_blocks(&mut state, id);
        }
        Ok(outcome)
    }

    /// Validates a linked block against the current head without applying it.
    ///
    /// A block that already ran is accepted again without re-validation.
    pub fn run_block(&self, id: &BlockId) -> Result<()> {
        let mut state = self.state.write();
        if !state.blocks.contains_key(id) {
            return Err(ChainError::UnknownBlock(hex::encode(id)));
        }
        Ok(self.run_block_in(&mut state, id)?)
    }

    fn ingest(&self, state: &mut ChainState, mut block: Block) -> BlockOutcome {
        let id = block.id();
        if state.blocks.contains_key(&id) {
            return BlockOutcome::Duplicate;
        }

        let parent_id = block.previous_hash();
        let Some((parent_height, parent_total)) = state.blocks.get(&parent_id).and_then(Block::linkage)
        else {
            let waiting = state.floating.entry(parent_id).or_default();
            if !waiting.contains(&id) {
                waiting.push(id);
            }
            debug!(block = %short_id(&id), parent = %short_id(&parent_id), "parent unknown, block is floating");
            return BlockOutcome::Floating {
                missing_parent: parent_id,
            };
        };

        let height = parent_height + 1;
        let total_difficulty = parent_total + block.difficulty();
        block.link(height, total_difficulty);
        state.blocks.insert(id, block);

        let head_total = state.head().total_difficulty().unwrap_or(0.0);
        if head_total >= total_difficulty {
            debug!(block = %short_id(&id), height, total_difficulty, head_total, "stored side block");
            return BlockOutcome::Stored {
                height,
                total_difficulty,
            };
        }

        self.reorganize(state, id)
    }

    /// Moves the head to `tip`, whose branch carries more work than the head's.
    ///
    /// Either every block between the fork point and `tip` validates and is
    /// applied, or the chain, UTXO set and mempool end up exactly as before.
    fn reorganize(&self, state: &mut ChainState, tip: BlockId) -> BlockOutcome {
        let head = state.latest;
        let Some(fork) = lowest_common_ancestor(&state.blocks, head, tip) else {
            warn!(tip = %short_id(&tip), "no common ancestor with the head");
            let (height, total_difficulty) = state.blocks.get(&tip).and_then(Block::linkage).unwrap_or_default();
            return BlockOutcome::Stored {
                height,
                total_difficulty,
            };
        };

        let reverting: Vec<BlockId> = Ancestors::new(&state.blocks, head)
            .map(Block::id)
            .take_while(|id| *id != fork)
            .collect();
        let mut applying: Vec<BlockId> = Ancestors::new(&state.blocks, tip)
            .map(Block::id)
            .take_while(|id| *id != fork)
            .collect();
        applying.reverse();

        state.journal = Some(MempoolJournal::new());
        for id in &reverting {
            self.revert(state, id);
        }

        for (i, id) in applying.iter().enumerate() {
            if let Err(reason) = self.run_block_in(state, id) {
                warn!(block = %short_id(id), %reason, "branch failed validation, restoring previous chain");
                self.purge_block(state, id);
                for applied in applying[..i].iter().rev() {
                    self.revert(state, applied);
                }
                for id in reverting.iter().rev() {
                    self.apply(state, id);
                }
                if let Some(journal) = state.journal.take() {
                    journal.restore(&mut self.inventory.mempool());
                }
                return BlockOutcome::Rejected { block: *id, reason };
            }
            self.apply(state, id);
        }
        state.journal = None;

        let height = state.head().height().unwrap_or(0);
        if reverting.is_empty() {
            BlockOutcome::Extended { height }
        } else {
            info!(
                fork = %short_id(&fork),
                reverted = reverting.len(),
                applied = applying.len(),
                height,
                "chain reorganized"
            );
            BlockOutcome::Reorganized {
                fork,
                reverted: reverting.len(),
                applied: applying.len(),
            }
        }
    }

    fn run_block_in(&self, state: &mut ChainState, id: &BlockId) -> std::result::Result<(), ValidationError> {
        // Ids handed in here always come from the block table.
        let Some(block) = state.blocks.get(id) else {
            return Ok(());
        };
        if block.is_run() {
            return Ok(());
        }
        debug!(block = %short_id(id), "running block");

        let head = state.head();
        let ancestors: Vec<&Block> = Ancestors::new(&state.blocks, block.previous_hash())
            .take(self.oracle.history_len())
            .collect();
        let expected_difficulty = self.oracle.next_difficulty(&ancestors);
        validate_header(block, head, expected_difficulty, now_millis())?;

        let mut transactions = parse_transactions(block)?;
        let (head_height, head_total) = head.linkage().unwrap_or_default();
        execute_transactions(
            &mut transactions,
            &state.utxos,
            block.timestamp(),
            coinbase_reward(head_height + 1),
        )?;

        let total_difficulty = head_total + block.difficulty();
        if let Some(block) = state.blocks.get_mut(id) {
            block.mark_run(head_height + 1, total_difficulty, transactions);
        }
        Ok(())
    }

    /// Commits a run block: mempool, UTXO set, head, miner notification.
    fn apply(&self, state: &mut ChainState, id: &BlockId) {
        let ChainState {
            blocks,
            utxos,
            latest,
            journal,
            ..
        } = state;
        let Some(block) = blocks.get(id) else {
            return;
        };
        let Some(transactions) = block.parsed_transactions() else {
            warn!(block = %short_id(id), "refusing to apply a block that never ran");
            return;
        };

        {
            let mut mempool = self.inventory.mempool();
            for tx in transactions.iter().filter(|tx| !tx.is_executed_coinbase()) {
                let prior = mempool.remove(&tx.id());
                if let Some(journal) = journal.as_mut() {
                    journal.record(tx.id(), prior);
                }
            }
        }
        for info in transactions.iter().filter_map(|tx| tx.exec_info()) {
            utxos.apply(info);
        }

        *latest = *id;
        let height = block.height().unwrap_or(0);
        info!(height, block = %block.short_id(), txs = transactions.len(), "applied block");
        if let Ok(header) = serde_json::to_string(&block.header) {
            debug!(%header, "applied block header");
        }
        self.notify(*id, height);
    }

    /// Undoes [`ChainEngine::apply`] and moves the head back to the parent.
    fn revert(&self, state: &mut ChainState, id: &BlockId) {
        let ChainState {
            blocks,
            utxos,
            latest,
            journal,
            ..
        } = state;
        let Some(block) = blocks.get(id) else {
            return;
        };

        if let Some(transactions) = block.parsed_transactions() {
            {
                let mut mempool = self.inventory.mempool();
                for tx in transactions.iter().filter(|tx| !tx.is_executed_coinbase()) {
                    let prior = mempool.insert(tx.pending());
                    if let Some(journal) = journal.as_mut() {
                        journal.record(tx.id(), prior);
                    }
                }
            }
            for info in transactions.iter().rev().filter_map(|tx| tx.exec_info()) {
                utxos.revert(info);
            }
        }

        *latest = block.previous_hash();
        let height = block.height().unwrap_or(0).saturating_sub(1);
        info!(height = block.height(), block = %block.short_id(), "reverted block");
        self.notify(*latest, height);
    }

    /// Re-ingests every floating block that was waiting on `id`, depth first.
    fn check_floating_blocks(&self, state: &mut ChainState, id: BlockId) {
        let mut pending = Vec::new();
        Self::queue_dependents(state, id, &mut pending);

        while let Some(dependent) = pending.pop() {
            let Some(payload) = self.inventory.block_payload(&dependent) else {
                debug!(block = %short_id(&dependent), "floating block payload is gone, skipping");
                continue;
            };
            let block = match decode_block(&payload) {
                Ok(block) => block,
                Err(e) => {
                    warn!(block = %short_id(&dependent), error = %e, "stored floating block does not decode");
                    continue;
                }
            };

            let outcome = self.ingest(state, block);
            debug!(block = %short_id(&dependent), ?outcome, "resolved floating block");
            if outcome.is_connected() {
                Self::queue_dependents(state, dependent, &mut pending);
            }
        }
    }

    fn queue_dependents(state: &mut ChainState, id: BlockId, pending: &mut Vec<BlockId>) {
        if let Some(waiting) = state.floating.remove(&id) {
            // Reversed so the first registered dependent is popped first.
            pending.extend(waiting.into_iter().rev());
        }
    }

    /// Drops an invalid block, everything built on it and everything waiting on it.
    ///
    /// Blocks that have run are never purged: they passed validation, and
    /// the canonical chain may depend on them.
    fn purge_block(&self, state: &mut ChainState, id: &BlockId) {
        let mut pending = vec![*id];
        while let Some(id) = pending.pop() {
            if state.blocks.get(&id).is_some_and(Block::is_run) {
                debug!(block = %short_id(&id), "not purging a block that ran");
                continue;
            }
            state.blocks.remove(&id);
            if let Some(waiting) = state.floating.remove(&id) {
                pending.extend(waiting);
            }
            pending.extend(
                state
                    .blocks
                    .values()
                    .filter(|block| block.previous_hash() == id)
                    .map(Block::id),
            );
            self.inventory.remove_block(&id);
            warn!(block = %short_id(&id), "purged block");
        }
    }

    fn notify(&self, head: BlockId, height: u64) {
        // A dropped receiver only means nobody is mining.
        let _ = self.events.send(ChainEvent::HeadChanged { head, height });
    }

    pub fn latest_block(&self) -> Block {
        self.state.read().head().clone()
    }

    pub fn latest_id(&self) -> BlockId {
        self.state.read().latest
    }

    pub fn height(&self) -> u64 {
        self.state.read().head().height().unwrap_or(0)
    }

    pub fn known_block_ids(&self) -> Vec<BlockId> {
        self.state.read().blocks.keys().copied().collect()
    }

    pub fn blocks(&self) -> HashMap<BlockId, Block> {
        self.state.read().blocks.clone()
    }

    pub fn block(&self, id: &BlockId) -> Option<Block> {
        self.state.read().blocks.get(id).cloned()
    }

    pub fn utxos(&self) -> UtxoSet {
        self.state.read().utxos.clone()
    }

    pub fn utxo(&self, outpoint: &OutPoint) -> Option<TransactionOutput> {
        self.state.read().utxos.get(outpoint).cloned()
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.state.read().utxos.balance_of(address)
    }

    /// Ids of blocks still waiting for their parent.
    pub fn floating_block_ids(&self) -> Vec<BlockId> {
        self.state.read().floating.values().flatten().copied().collect()
    }

    /// Difficulty a child of `parent` has to declare, if `parent` is known.
    pub fn next_difficulty(&self, parent: &BlockId) -> Option<f64> {
        let state = self.state.read();
        state.blocks.get(parent)?;
        let ancestors: Vec<&Block> = Ancestors::new(&state.blocks, *parent)
            .take(self.oracle.history_len())
            .collect();
        Some(self.oracle.next_difficulty(&ancestors))
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    pub fn oracle(&self) -> &DifficultyOracle {
        &self.oracle
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
