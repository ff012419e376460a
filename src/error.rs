//! Error types for ForgeChain

use thiserror::Error;

/// A consensus rule that a block or transaction broke.
///
/// Every variant maps to exactly one rule so that callers can report
/// which check rejected a block.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("block timestamp {timestamp} is ahead of local time {now}")]
    FutureTimestamp { timestamp: u64, now: u64 },
    #[error("block timestamp {timestamp} is not after head timestamp {head}")]
    StaleTimestamp { timestamp: u64, head: u64 },
    #[error("block carries no transactions")]
    EmptyBlock,
    #[error("block lists {ids} transaction ids but carries {payloads} payloads")]
    TransactionCountMismatch { ids: usize, payloads: usize },
    #[error("transaction root mismatch: expected {expected}, got {actual}")]
    MerkleRootMismatch { expected: String, actual: String },
    #[error("block extends {actual}, but the head is {expected}")]
    WrongParent { expected: String, actual: String },
    #[error("declared difficulty {declared} is not the expected {expected}")]
    DifficultyMismatch { declared: f64, expected: f64 },
    #[error("block id only proves difficulty {proven}, below declared {declared}")]
    InsufficientWork { declared: f64, proven: f64 },
    #[error("transaction {0} could not be decoded")]
    MalformedTransaction(usize),
    #[error("transaction {index} hashes to {actual}, but the block lists {expected}")]
    TransactionIdMismatch {
        index: usize,
        expected: String,
        actual: String,
    },
    #[error("transaction must either be a coinbase or spend inputs, not both or neither")]
    CoinbaseShape,
    #[error("transaction timestamp {tx} is after block timestamp {block}")]
    TransactionAfterBlock { tx: u64, block: u64 },
    #[error("signature check failed for input {0}")]
    BadSignature(usize),
    #[error("referenced output {0} is not unspent")]
    MissingOutput(String),
    #[error("output {0} is spent twice in the same block")]
    DoubleSpend(String),
    #[error("input {0} public key does not own the referenced output")]
    RecipientMismatch(usize),
    #[error("output {0} has a zero amount or an empty recipient")]
    InvalidOutput(usize),
    #[error("outputs total {outputs} exceed inputs total {inputs}")]
    OutputsExceedInputs { inputs: u64, outputs: u64 },
    #[error("amount arithmetic overflowed")]
    Overflow,
    #[error("output {0} already exists and is unspent")]
    DuplicateOutput(String),
}

#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("Codec error: {0}")]
    Codec(String),
    #[error("Invalid block: {0}")]
    Validation(#[from] ValidationError),
    #[error("Cryptographic error: {0}")]
    Crypto(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Unknown block: {0}")]
    UnknownBlock(String),
    #[error("No nonce met difficulty {difficulty} within {attempts} attempts")]
    SealExhausted { difficulty: f64, attempts: u64 },
}

impl ChainError {
    /// Returns the broken consensus rule, if this is a validation failure.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ChainError::Validation(rule) => Some(rule),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::Codec(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
