//! Difficulty rules: retargeting and proof of work

use crate::blockchain::{Block, BlockId};
use crate::config::ConsensusConfig;

/// Relative tolerance allowed between a declared and an expected difficulty.
pub const DIFFICULTY_TOLERANCE: f64 = 1e-15;

/// Bounds on how far a single retarget may move the difficulty.
const MIN_RETARGET_RATIO: f64 = 0.25;
const MAX_RETARGET_RATIO: f64 = 4.0;

/// Computes the difficulty a block must declare and checks the work its id proves.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyOracle {
    genesis_difficulty: f64,
    min_difficulty: f64,
    target_block_time_ms: u64,
    retarget_window: usize,
}

impl Default for DifficultyOracle {
    fn default() -> Self {
        Self::new(&ConsensusConfig::default())
    }
}

impl DifficultyOracle {
    pub fn new(config: &ConsensusConfig) -> Self {
        Self {
            genesis_difficulty: config.genesis_difficulty,
            min_difficulty: config.min_difficulty,
            target_block_time_ms: config.target_block_time_ms,
            retarget_window: config.retarget_window.max(1),
        }
    }

    pub fn genesis_difficulty(&self) -> f64 {
        self.genesis_difficulty
    }

    /// How many ancestors `next_difficulty` looks at.
    pub fn history_len(&self) -> usize {
        self.retarget_window.saturating_add(1)
    }

    /// Difficulty expected of a child of `ancestors[0]`.
    ///
    /// `ancestors` runs from the parent backwards. While the history is
    /// shorter than the retarget window the parent's difficulty carries
    /// over; afterwards it is scaled by how far the window's actual span
    /// strayed from the target span.
    pub fn next_difficulty(&self, ancestors: &[&Block]) -> f64 {
        let Some(parent) = ancestors.first() else {
            return self.genesis_difficulty;
        };
        let Some(oldest) = ancestors.get(self.retarget_window) else {
            return parent.difficulty();
        };

        let actual = parent.timestamp().saturating_sub(oldest.timestamp()).max(1);
        let expected = (self.retarget_window as u64).saturating_mul(self.target_block_time_ms);
        let ratio = (expected as f64 / actual as f64).clamp(MIN_RETARGET_RATIO, MAX_RETARGET_RATIO);
        (parent.difficulty() * ratio).max(self.min_difficulty)
    }

    /// Work proven by a block id: `2^64 / (leading 8 bytes + 1)`, never below 1.
    pub fn difficulty_of(id: &BlockId) -> f64 {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&id[..8]);
        let value = u64::from_be_bytes(prefix) as f64;
        ((u64::MAX as f64) / (value + 1.0)).max(1.0)
    }

    pub fn within_tolerance(declared: f64, expected: f64) -> bool {
        declared < expected * (1.0 + DIFFICULTY_TOLERANCE)
            && declared > expected * (1.0 - DIFFICULTY_TOLERANCE)
    }
}
