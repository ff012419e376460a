//! ForgeChain - consensus core of a minimal UTXO proof-of-work node
//!
//! # Architecture
//!
//! ## Core Blockchain
//! - [`blockchain`] - Block graph, UTXO set, block validation and the chain engine
//! - [`transaction`] - Transaction types, signing and execution
//! - [`mempool`] - Pending transactions and reorg journaling
//! - [`inventory`] - Raw block payloads and the shared mempool
//! - [`codec`] - Wire encoding of blocks and transactions
//!
//! ## Consensus & Mining
//! - [`consensus`] - Difficulty retargeting and proof of work
//! - [`economics`] - Block subsidy schedule
//! - [`miner`] - Miner notifications and block sealing
//! - [`genesis`] - Genesis block construction
//!
//! ## Cryptography
//! - [`crypto`] - Addresses and signatures (secp256k1)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;
pub mod codec;
pub mod inventory;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod consensus;
pub mod economics;
pub mod genesis;
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
