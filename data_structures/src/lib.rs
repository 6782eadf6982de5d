//! # Basalt data structures
//!
//! This module contains the data structures of the Basalt protocol:
//! chain primitives (hashes, currency, outputs, storage contracts,
//! transactions and blocks), the unspent outputs pool, the in-memory
//! pool of unconfirmed transaction sets (the _mempool_) and the error
//! types shared by the rest of the system.

/// Bounded associative cache with FIFO eviction
pub mod cache;
/// Chain primitives: hashes, epochs, pointers, beacons and blocks
pub mod chain;
/// Currency unit
pub mod coin;
/// Error type definitions
pub mod error;
/// Absolute and relative miner fees
pub mod fee;
/// Pool of unconfirmed transaction sets
pub mod mempool;
/// Transactions and their components
pub mod transaction;
/// Protocol messages exchanged between peers
pub mod types;
/// Unspent outputs pool, storage contract registry and ledger diffs
pub mod utxo_pool;
