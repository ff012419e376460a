//! Construction of the genesis block

use crate::blockchain::Block;
use crate::config::Config;
use crate::crypto::Address;
use crate::economics::coinbase_reward;
use crate::error::Result;
use crate::miner::BlockTemplate;
use crate::transaction::Transaction;

/// Genesis difficulty is low enough that this bound is never reached in practice.
const GENESIS_SEAL_ATTEMPTS: u64 = 10_000_000;

/// Builds the genesis block: one coinbase paying the height-0 reward to `beneficiary`.
pub fn create_genesis_block(beneficiary: Address, timestamp: u64, difficulty: f64) -> Result<Block> {
    let coinbase = Transaction::coinbase(timestamp, beneficiary, coinbase_reward(0));
    BlockTemplate {
        previous_hash: [0u8; 32],
        timestamp,
        difficulty,
        transactions: vec![coinbase],
    }
    .seal(GENESIS_SEAL_ATTEMPTS)
}

pub fn genesis_from_config(config: &Config) -> Result<Block> {
    create_genesis_block(
        config.genesis.beneficiary()?,
        config.genesis.timestamp,
        config.consensus.genesis_difficulty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address_from_string;

    #[test]
    fn test_genesis_is_deterministic() {
        let config = Config::default();
        let a = genesis_from_config(&config).unwrap();
        let b = genesis_from_config(&config).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.previous_hash(), [0u8; 32]);
        assert_eq!(a.header.transaction_ids.len(), 1);
    }

    #[test]
    fn test_beneficiary_changes_genesis() {
        let a = create_genesis_block(address_from_string("a"), 1, 1.0).unwrap();
        let b = create_genesis_block(address_from_string("b"), 1, 1.0).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
