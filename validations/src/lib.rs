//! # Basalt validations
//!
//! Ledger-level validation of transaction sets and blocks: the "try
//! transaction set" primitive consumed by the transactions pool, and
//! the block consolidation checks used by the chain manager.

/// Validation of blocks extending the chain tip
pub mod consolidation;
/// Validation of transaction sets against a UTXO view
pub mod validations;
