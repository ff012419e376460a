use crate::transaction::{Transaction, TxId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

pub type Sha256Hash = [u8; 32];
pub type BlockId = Sha256Hash;

/// Seven hex characters are enough to tell blocks apart in logs.
pub fn short_id(hash: &Sha256Hash) -> String {
    hex::encode(&hash[..4])[..7].to_string()
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    pub previous_hash: BlockId,
    pub timestamp: u64,
    pub difficulty: f64,
    pub nonce: u64,
    pub transaction_root: Sha256Hash,
    pub transaction_ids: Vec<TxId>,
}

impl BlockHeader {
    pub fn hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.previous_hash);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.difficulty.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(self.transaction_root);
        hasher.update((self.transaction_ids.len() as u64).to_le_bytes());
        for id in &self.transaction_ids {
            hasher.update(id);
        }
        hasher.finalize().into()
    }
}

/// Where a block stands in the engine's lifecycle.
///
/// `Linked` blocks know their position in the block graph; `Run` blocks
/// have additionally passed full validation and carry their executed
/// transactions. A reverted block stays `Run`: its validation result
/// still holds if the branch becomes canonical again.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BlockState {
    #[default]
    Unlinked,
    Linked {
        height: u64,
        total_difficulty: f64,
    },
    Run {
        height: u64,
        total_difficulty: f64,
        transactions: Vec<Transaction>,
    },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Raw transaction payloads, positionally matching `header.transaction_ids`.
    pub transactions: Vec<Vec<u8>>,
    #[serde(skip)]
    id: BlockId,
    #[serde(skip)]
    state: BlockState,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Vec<u8>>) -> Self {
        let id = header.hash();
        Block {
            header,
            transactions,
            id,
            state: BlockState::Unlinked,
        }
    }

    /// Recomputes the id after the header was decoded or resealed.
    pub(crate) fn refresh_id(&mut self) {
        self.id = self.header.hash();
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }

    pub fn previous_hash(&self) -> BlockId {
        self.header.previous_hash
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    pub fn difficulty(&self) -> f64 {
        self.header.difficulty
    }

    pub fn state(&self) -> &BlockState {
        &self.state
    }

    /// Height and cumulative difficulty, once the block is linked.
    pub fn linkage(&self) -> Option<(u64, f64)> {
        match &self.state {
            BlockState::Unlinked => None,
            BlockState::Linked {
                height,
                total_difficulty,
            }
            | BlockState::Run {
                height,
                total_difficulty,
                ..
            } => Some((*height, *total_difficulty)),
        }
    }

    pub fn height(&self) -> Option<u64> {
        self.linkage().map(|(height, _)| height)
    }

    pub fn total_difficulty(&self) -> Option<f64> {
        self.linkage().map(|(_, total)| total)
    }

    pub fn parsed_transactions(&self) -> Option<&[Transaction]> {
        match &self.state {
            BlockState::Run { transactions, .. } => Some(transactions.as_slice()),
            _ => None,
        }
    }

    pub fn is_run(&self) -> bool {
        matches!(self.state, BlockState::Run { .. })
    }

    pub(crate) fn link(&mut self, height: u64, total_difficulty: f64) {
        self.state = BlockState::Linked {
            height,
            total_difficulty,
        };
    }

    pub(crate) fn mark_run(&mut self, height: u64, total_difficulty: f64, transactions: Vec<Transaction>) {
        self.state = BlockState::Run {
            height,
            total_difficulty,
            transactions,
        };
    }

    /// Merkle root over an ordered list of transaction ids.
    ///
    /// Pairs are hashed level by level; an odd node is paired with itself.
    /// An empty list hashes to all zeroes.
    pub fn calculate_merkle_root(ids: &[TxId]) -> Sha256Hash {
        if ids.is_empty() {
            return [0u8; 32];
        }

        let mut level: Vec<Sha256Hash> = ids.to_vec();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    let right = pair.get(1).unwrap_or(left);
                    let mut hasher = Sha256::new();
                    hasher.update(left);
                    hasher.update(right);
                    hasher.finalize().into()
                })
                .collect();
        }
        level[0]
    }
}

/// Walks a block and its ancestors through previous-hash links, newest first.
pub struct Ancestors<'a> {
    blocks: &'a HashMap<BlockId, Block>,
    next: Option<BlockId>,
}

impl<'a> Ancestors<'a> {
    pub fn new(blocks: &'a HashMap<BlockId, Block>, from: BlockId) -> Self {
        Ancestors {
            blocks,
            next: Some(from),
        }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.blocks.get(&self.next?)?;
        self.next = Some(block.previous_hash());
        Some(block)
    }
}

/// Finds the most recent block shared by the chains ending at `a` and `b`.
pub fn lowest_common_ancestor(
    blocks: &HashMap<BlockId, Block>,
    a: BlockId,
    b: BlockId,
) -> Option<BlockId> {
    let mut a = blocks.get(&a)?;
    let mut b = blocks.get(&b)?;

    while a.id() != b.id() {
        let (height_a, height_b) = (a.height()?, b.height()?);
        if height_a >= height_b {
            a = blocks.get(&a.previous_hash())?;
        }
        if height_b >= height_a {
            b = blocks.get(&b.previous_hash())?;
        }
    }
    Some(a.id())
}
