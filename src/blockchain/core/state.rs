use crate::crypto::Address;
use crate::transaction::{ExecInfo, OutPoint, TransactionOutput};
use std::collections::HashMap;

/// Outputs spendable under the canonical chain, keyed by (transaction, index).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    outputs: HashMap<OutPoint, TransactionOutput>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TransactionOutput> {
        self.outputs.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.outputs.contains_key(outpoint)
    }

    pub fn insert(&mut self, output: TransactionOutput) -> Option<TransactionOutput> {
        self.outputs.insert(output.outpoint(), output)
    }

    pub fn remove(&mut self, outpoint: &OutPoint) -> Option<TransactionOutput> {
        self.outputs.remove(outpoint)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionOutput> {
        self.outputs.values()
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.outputs
            .values()
            .filter(|output| output.recipient.as_slice() == address.as_slice())
            .map(|output| output.amount)
            .sum()
    }

    /// Commits an executed transaction: its inputs leave, its outputs arrive.
    pub fn apply(&mut self, info: &ExecInfo) {
        for output in &info.redeemed {
            self.outputs.remove(&output.outpoint());
        }
        for output in &info.generated {
            self.insert(output.clone());
        }
    }

    /// Exact inverse of [`UtxoSet::apply`].
    pub fn revert(&mut self, info: &ExecInfo) {
        for output in &info.generated {
            self.outputs.remove(&output.outpoint());
        }
        for output in &info.redeemed {
            self.insert(output.clone());
        }
    }
}
