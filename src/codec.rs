//! Byte-level encoding of blocks and transactions (bincode)

use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;

/// Largest block payload accepted for decoding (4 MB).
pub const MAX_BLOCK_SIZE: usize = 4_000_000;
/// Largest transaction payload accepted for decoding (100 KB).
pub const MAX_TRANSACTION_SIZE: usize = 100_000;

pub fn encode_block(block: &Block) -> Result<Vec<u8>> {
    Ok(bincode::serialize(block)?)
}

/// Decodes a block and derives its id from the header.
pub fn decode_block(bytes: &[u8]) -> Result<Block> {
    if bytes.len() > MAX_BLOCK_SIZE {
        return Err(ChainError::Codec(format!(
            "Block too large: {} bytes (max: {})",
            bytes.len(),
            MAX_BLOCK_SIZE
        )));
    }
    let mut block: Block = bincode::deserialize(bytes)?;
    block.refresh_id();
    Ok(block)
}

pub fn encode_transaction(tx: &Transaction) -> Result<Vec<u8>> {
    Ok(bincode::serialize(tx)?)
}

/// Decodes a transaction and derives its id from its contents.
pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction> {
    if bytes.len() > MAX_TRANSACTION_SIZE {
        return Err(ChainError::Codec(format!(
            "Transaction too large: {} bytes (max: {})",
            bytes.len(),
            MAX_TRANSACTION_SIZE
        )));
    }
    let mut tx: Transaction = bincode::deserialize(bytes)?;
    tx.refresh_id();
    Ok(tx)
}
