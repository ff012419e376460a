/// Transaction types for ForgeChain
use crate::blockchain::{short_id, Sha256Hash};
use crate::crypto::{Address, KeyPair};
use sha2::{Digest, Sha256};
use std::fmt;

pub type TxId = Sha256Hash;

/// Identifies one output of one transaction; the key of the UTXO set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct OutPoint {
    pub tx_id: TxId,
    pub index: u16,
}

impl OutPoint {
    pub fn new(tx_id: TxId, index: u16) -> Self {
        OutPoint { tx_id, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", short_id(&self.tx_id), self.index)
    }
}

/// An output as recorded in the UTXO set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionOutput {
    pub tx_id: TxId,
    pub index: u16,
    pub recipient: Vec<u8>,
    pub amount: u64,
}

impl TransactionOutput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_id, self.index)
    }
}

/// A reference to the output being spent, with the key that proves ownership.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InEntry {
    pub tx_id: TxId,
    pub out_index: u16,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl InEntry {
    /// An input that still has to be signed.
    pub fn unsigned(outpoint: OutPoint) -> Self {
        InEntry {
            tx_id: outpoint.tx_id,
            out_index: outpoint.index,
            public_key: Vec::new(),
            signature: Vec::new(),
        }
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_id, self.out_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutEntry {
    pub recipient: Vec<u8>,
    pub amount: u64,
}

impl OutEntry {
    pub fn new(recipient: Address, amount: u64) -> Self {
        OutEntry {
            recipient: recipient.to_vec(),
            amount,
        }
    }
}

/// The result of executing a transaction against the UTXO set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecInfo {
    pub coinbase: bool,
    pub redeemed: Vec<TransactionOutput>,
    pub generated: Vec<TransactionOutput>,
    pub fee: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    #[serde(skip)]
    id: TxId,
    pub timestamp: u64,
    pub in_entries: Vec<InEntry>,
    pub out_entries: Vec<OutEntry>,
    #[serde(skip)]
    exec_info: Option<ExecInfo>,
}

impl Transaction {
    pub fn new(timestamp: u64, in_entries: Vec<InEntry>, out_entries: Vec<OutEntry>) -> Self {
        let mut tx = Transaction {
            id: [0u8; 32],
            timestamp,
            in_entries,
            out_entries,
            exec_info: None,
        };
        tx.refresh_id();
        tx
    }

    /// A reward-issuing transaction with a single output.
    pub fn coinbase(timestamp: u64, recipient: Address, amount: u64) -> Self {
        Self::new(timestamp, vec![], vec![OutEntry::new(recipient, amount)])
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.id)
    }

    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }

    pub fn exec_info(&self) -> Option<&ExecInfo> {
        self.exec_info.as_ref()
    }

    pub(crate) fn set_exec_info(&mut self, exec_info: ExecInfo) {
        self.exec_info = Some(exec_info);
    }

    /// A copy suitable for the mempool: same transaction, no execution results.
    pub fn pending(&self) -> Self {
        let mut tx = self.clone();
        tx.exec_info = None;
        tx
    }

    /// True when execution marked this transaction as the block's coinbase.
    pub fn is_executed_coinbase(&self) -> bool {
        self.exec_info.as_ref().is_some_and(|info| info.coinbase)
    }

    pub(crate) fn refresh_id(&mut self) {
        self.id = self.digest(true);
    }

    /// Hash every input signs: the transaction with all signatures stripped.
    pub fn sign_hash(&self) -> Sha256Hash {
        self.digest(false)
    }

    /// Attaches `keypair`'s public key to every input and signs them.
    pub fn sign_inputs(&mut self, keypair: &KeyPair) {
        let public_key = keypair.public_key_bytes().to_vec();
        for input in &mut self.in_entries {
            input.public_key = public_key.clone();
        }
        let hash = self.sign_hash();
        let signature = keypair.sign_hash(&hash).to_vec();
        for input in &mut self.in_entries {
            input.signature = signature.clone();
        }
        self.refresh_id();
    }

    fn digest(&self, with_signatures: bool) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(b"tx");
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update((self.in_entries.len() as u64).to_le_bytes());
        for input in &self.in_entries {
            hasher.update(input.tx_id);
            hasher.update(input.out_index.to_le_bytes());
            hasher.update((input.public_key.len() as u64).to_le_bytes());
            hasher.update(&input.public_key);
            if with_signatures {
                hasher.update((input.signature.len() as u64).to_le_bytes());
                hasher.update(&input.signature);
            }
        }
        hasher.update((self.out_entries.len() as u64).to_le_bytes());
        for output in &self.out_entries {
            hasher.update((output.recipient.len() as u64).to_le_bytes());
            hasher.update(&output.recipient);
            hasher.update(output.amount.to_le_bytes());
        }
        hasher.finalize().into()
    }
}
