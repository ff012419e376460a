//! Upstream store shared with the network layer: raw block payloads and the mempool

use crate::blockchain::BlockId;
use crate::mempool::Mempool;
use crate::transaction::Transaction;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;

/// The block store and the mempool are locked independently, so mempool
/// readers never wait on block lookups made during a long reorg.
#[derive(Debug, Default)]
pub struct Inventory {
    blocks: RwLock<HashMap<BlockId, Vec<u8>>>,
    mempool: Mutex<Mempool>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw block payload; an existing payload for `id` is kept.
    pub fn put_block(&self, id: BlockId, payload: Vec<u8>) {
        self.blocks.write().entry(id).or_insert(payload);
    }

    pub fn block_payload(&self, id: &BlockId) -> Option<Vec<u8>> {
        self.blocks.read().get(id).cloned()
    }

    pub fn contains_block(&self, id: &BlockId) -> bool {
        self.blocks.read().contains_key(id)
    }

    pub fn remove_block(&self, id: &BlockId) -> Option<Vec<u8>> {
        self.blocks.write().remove(id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }

    /// Locks the mempool for the lifetime of the returned guard.
    pub fn mempool(&self) -> MutexGuard<'_, Mempool> {
        self.mempool.lock()
    }

    pub fn submit_transaction(&self, tx: Transaction) {
        self.mempool.lock().insert(tx);
    }
}
