use crate::codec::decode_transaction;
use crate::consensus::DifficultyOracle;
use crate::error::ValidationError;
use crate::transaction::{OutPoint, Transaction};
use std::collections::HashSet;

use super::chain::Block;
use super::state::UtxoSet;

/// Header-level rules, checked relative to the block the candidate must extend.
pub fn validate_header(
    block: &Block,
    head: &Block,
    expected_difficulty: f64,
    now: u64,
) -> Result<(), ValidationError> {
    let header = &block.header;

    if header.timestamp > now {
        return Err(ValidationError::FutureTimestamp {
            timestamp: header.timestamp,
            now,
        });
    }
    if header.timestamp <= head.timestamp() {
        return Err(ValidationError::StaleTimestamp {
            timestamp: header.timestamp,
            head: head.timestamp(),
        });
    }
    if block.transactions.is_empty() {
        return Err(ValidationError::EmptyBlock);
    }
    if block.transactions.len() != header.transaction_ids.len() {
        return Err(ValidationError::TransactionCountMismatch {
            ids: header.transaction_ids.len(),
            payloads: block.transactions.len(),
        });
    }

    let root = Block::calculate_merkle_root(&header.transaction_ids);
    if root != header.transaction_root {
        return Err(ValidationError::MerkleRootMismatch {
            expected: hex::encode(root),
            actual: hex::encode(header.transaction_root),
        });
    }
    if header.previous_hash != head.id() {
        return Err(ValidationError::WrongParent {
            expected: hex::encode(head.id()),
            actual: hex::encode(header.previous_hash),
        });
    }
    if !DifficultyOracle::within_tolerance(header.difficulty, expected_difficulty) {
        return Err(ValidationError::DifficultyMismatch {
            declared: header.difficulty,
            expected: expected_difficulty,
        });
    }

    let proven = DifficultyOracle::difficulty_of(&block.id());
    if header.difficulty > proven {
        return Err(ValidationError::InsufficientWork {
            declared: header.difficulty,
            proven,
        });
    }
    Ok(())
}

/// Decodes every payload and checks it against the id the header lists for it.
pub fn parse_transactions(block: &Block) -> Result<Vec<Transaction>, ValidationError> {
    block
        .transactions
        .iter()
        .zip(&block.header.transaction_ids)
        .enumerate()
        .map(|(index, (payload, expected))| {
            let tx = decode_transaction(payload)
                .map_err(|_| ValidationError::MalformedTransaction(index))?;
            if tx.id() != *expected {
                return Err(ValidationError::TransactionIdMismatch {
                    index,
                    expected: hex::encode(expected),
                    actual: tx.hash_str(),
                });
            }
            Ok(tx)
        })
        .collect()
}

/// Runs a block's transactions in consensus order.
///
/// Ordinary transactions (index 1 onwards) run first so that their fees
/// can be added to the reward; the coinbase at index 0 runs last with the
/// total. Outputs redeemed earlier in the block cannot be redeemed again.
pub fn execute_transactions(
    transactions: &mut [Transaction],
    utxos: &UtxoSet,
    block_timestamp: u64,
    reward: u64,
) -> Result<(), ValidationError> {
    let Some((coinbase_tx, ordinary)) = transactions.split_first_mut() else {
        return Err(ValidationError::EmptyBlock);
    };

    let mut coinbase = reward;
    let mut spent: HashSet<OutPoint> = HashSet::new();
    for tx in ordinary.iter_mut() {
        tx.run(utxos, block_timestamp, 0, Some(&spent))?;
        if let Some(info) = tx.exec_info() {
            coinbase = coinbase
                .checked_add(info.fee)
                .ok_or(ValidationError::Overflow)?;
            spent.extend(info.redeemed.iter().map(|output| output.outpoint()));
        }
    }

    coinbase_tx.run(utxos, block_timestamp, coinbase, None)
}
