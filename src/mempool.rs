//! Pending transactions awaiting inclusion in a block

use crate::transaction::{Transaction, TxId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mempool {
    transactions: HashMap<TxId, Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `tx`, returning whatever was stored under its id before.
    pub fn insert(&mut self, tx: Transaction) -> Option<Transaction> {
        self.transactions.insert(tx.id(), tx)
    }

    pub fn remove(&mut self, id: &TxId) -> Option<Transaction> {
        self.transactions.remove(id)
    }

    pub fn get(&self, id: &TxId) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.transactions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }
}

/// Remembers the value each touched id had before the first edit.
///
/// Replaying the journal in [`MempoolJournal::restore`] puts every touched
/// entry back exactly as it was, whatever happened in between.
#[derive(Debug, Default)]
pub struct MempoolJournal {
    prior: HashMap<TxId, Option<Transaction>>,
}

impl MempoolJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `prior` as the original value of `id` unless `id` was already touched.
    pub fn record(&mut self, id: TxId, prior: Option<Transaction>) {
        self.prior.entry(id).or_insert(prior);
    }

    pub fn is_empty(&self) -> bool {
        self.prior.is_empty()
    }

    pub fn restore(self, mempool: &mut Mempool) {
        for (id, prior) in self.prior {
            match prior {
                Some(tx) => {
                    mempool.insert(tx);
                }
                None => {
                    mempool.remove(&id);
                }
            }
        }
    }
}
