// Thin re-export module: implementation is in `blockchain/core.rs`, split
// into block types, UTXO state, block validation and the chain engine.

pub mod core;
pub use core::*;
