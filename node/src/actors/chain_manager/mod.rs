//! # ChainManager actor
//!
//! This module contains the ChainManager actor, which owns the two
//! pieces of state that must never change out of step: the ledger
//! (chain tip, unspent outputs, storage contracts, confirmed
//! transactions) and the pool of unconfirmed transaction sets.
//!
//! Among its responsibilities are the following:
//!
//! * Processing blocks relayed by peers and consolidating them as the
//!   new chain tip.
//! * Validating candidate transaction sets against the current tip and
//!   admitting them into the transactions pool.
//! * Evicting pooled sets once their transactions are confirmed by a
//!   block, re-admitting whatever remains unconfirmed.
//! * Handing admitted sets over to the sessions manager for relay.
//!
//! Because both block application and set admission are messages
//! processed to completion by this single actor, a chain tip change
//! can never interleave with the validate-then-install sequence of an
//! admission. This mailbox *is* the critical section that the
//! admission engine requires.

use std::sync::Arc;

use actix::prelude::*;
use ansi_term::Color::{Purple, Yellow};

use basalt_config::config::Config;
use basalt_data_structures::{
    cache::FifoMap,
    chain::{
        calculate_sha256, Block, ChainState, CheckpointBeacon, Hash, Hashable, OutputPointer,
        PublicKeyHash,
    },
    coin::Coin,
    error::{BlockError, TransactionPoolError},
    mempool::{minimum_transaction_set, PoolPolicy, TransactionsPool},
    transaction::{CoinOutput, Transaction},
    types::Command,
};
use basalt_validations::{consolidation::validate_block, validations::validate_transaction_set};

use crate::actors::{messages::Broadcast, sessions_manager::SessionsManager};

mod actor;
mod handlers;

/// Number of recently processed block hashes kept for relay dedup
pub const RECENT_BLOCKS_CACHE: usize = 64;

/// ChainManager actor
#[derive(Debug)]
pub struct ChainManager {
    /// Blockchain state data structure
    chain_state: ChainState,
    /// Transactions Pool (_mempool_)
    transactions_pool: TransactionsPool,
    /// Hashes of recently processed blocks, so that relay storms do
    /// not trigger repeated validation
    recent_blocks: FifoMap<Hash, ()>,
    /// Magic number of the network
    magic: u16,
}

impl Default for ChainManager {
    fn default() -> Self {
        ChainManager {
            chain_state: ChainState::default(),
            transactions_pool: TransactionsPool::default(),
            recent_blocks: FifoMap::with_capacity(RECENT_BLOCKS_CACHE),
            magic: 0,
        }
    }
}

/// Required trait for being able to retrieve ChainManager address from registry
impl Supervised for ChainManager {}

/// Required trait for being able to retrieve ChainManager address from registry
impl SystemService for ChainManager {}

/// Auxiliary methods for ChainManager actor
impl ChainManager {
    /// Build a ChainManager from the node configuration: admission
    /// policy, network magic and the premined genesis allocations.
    pub fn from_config(config: &Arc<Config>) -> Self {
        let policy = PoolPolicy {
            size_for_fee: config.mempool.size_for_fee,
            size_target: config.mempool.size_target,
            fee_exponent: config.mempool.fee_exponent,
            base_fee_per_byte: config.mempool.base_fee_per_byte,
            max_transaction_size: config.mempool.max_transaction_size,
            max_set_size: config.mempool.max_set_size,
            transaction_max_age: config.mempool.transaction_max_age,
        };

        let mut chain_state = ChainState::default();
        for (index, allocation) in config.genesis.allocations.iter().enumerate() {
            let address: PublicKeyHash = match allocation.address.parse() {
                Ok(address) => address,
                Err(e) => {
                    log::warn!(
                        "Skipping genesis allocation with invalid address {:?}: {}",
                        allocation.address,
                        e
                    );
                    continue;
                }
            };
            chain_state.unspent_outputs_pool.insert(
                OutputPointer {
                    transaction_id: calculate_sha256(b"genesis"),
                    output_index: index as u32,
                },
                CoinOutput {
                    value: Coin::from_motes(allocation.value),
                    address,
                },
                0,
            );
        }

        ChainManager {
            chain_state,
            transactions_pool: TransactionsPool::with_policy(policy),
            recent_blocks: FifoMap::with_capacity(RECENT_BLOCKS_CACHE),
            magic: config.connections.magic,
        }
    }

    /// Current chain tip
    pub fn get_chain_beacon(&self) -> CheckpointBeacon {
        self.chain_state.highest_block_checkpoint
    }

    /// Run the admission pipeline for a candidate transaction set and
    /// return the minimum subset peers need in order to accept it.
    ///
    /// The whole validate-then-install sequence runs inside this
    /// actor's message handling, so no tip change can interleave.
    fn add_transaction_set(
        &mut self,
        candidate: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, TransactionPoolError> {
        let original = candidate.clone();
        self.transactions_pool
            .set_current_epoch(self.chain_state.block_epoch());

        let ChainManager {
            chain_state,
            transactions_pool,
            ..
        } = self;
        let is_confirmed = |id: &Hash| chain_state.transaction_confirmed(id);
        let mut validate = |txns: &[Transaction]| {
            validate_transaction_set(
                txns,
                &chain_state.unspent_outputs_pool,
                &chain_state.storage_contracts,
                chain_state.block_epoch() + 1,
            )
        };

        let superset =
            transactions_pool.accept_transaction_set(candidate, &is_confirmed, &mut validate)?;
        log::debug!(
            "{} transaction set admitted ({} transactions pooled in {} sets, {} bytes)",
            Purple.bold().paint("[Pool]"),
            transactions_pool.transaction_count(),
            transactions_pool.len(),
            transactions_pool.total_bytes(),
        );

        Ok(minimum_transaction_set(&original, &superset))
    }

    /// Consolidate a block as the new chain tip and bring the
    /// transactions pool in sync with it.
    fn process_block(&mut self, block: &Block) -> Result<(), BlockError> {
        let block_hash = block.hash();
        if self.recent_blocks.contains_key(&block_hash) {
            return Err(BlockError::KnownBlock);
        }

        let diff = validate_block(block, &self.chain_state)?;
        self.recent_blocks.insert(block_hash, ());

        // Consolidate: apply the ledger effects and move the tip
        let checkpoint = block.block_header.beacon.checkpoint;
        diff.apply(
            &mut self.chain_state.unspent_outputs_pool,
            &mut self.chain_state.storage_contracts,
            checkpoint,
        );
        for txn in &block.txns {
            self.chain_state.confirmed_transactions.insert(txn.hash());
        }
        self.chain_state.highest_block_checkpoint = CheckpointBeacon {
            checkpoint,
            hash_prev_block: block_hash,
        };
        log::info!(
            "{} consolidated block {} for epoch {} with {} transactions",
            Yellow.bold().paint("[Chain]"),
            block_hash,
            checkpoint,
            block.txns.len(),
        );

        // Pool maintenance against the new tip, still inside the same
        // message handling: evict confirmed transactions and re-admit
        // the rest, then purge sets that lingered for too long
        self.transactions_pool.set_current_epoch(checkpoint);
        let ChainManager {
            chain_state,
            transactions_pool,
            ..
        } = self;
        let is_confirmed = |id: &Hash| chain_state.transaction_confirmed(id);
        let mut validate = |txns: &[Transaction]| {
            validate_transaction_set(
                txns,
                &chain_state.unspent_outputs_pool,
                &chain_state.storage_contracts,
                chain_state.block_epoch() + 1,
            )
        };
        let (readmitted, dropped) = transactions_pool.remove_confirmed(&is_confirmed, &mut validate);
        let purged = transactions_pool.purge_stale();
        log::debug!(
            "{} pool in sync with epoch {}: {} sets re-admitted, {} dropped, {} purged by age",
            Purple.bold().paint("[Pool]"),
            checkpoint,
            readmitted,
            dropped,
            purged,
        );

        Ok(())
    }

    /// Hand an admitted set over to the sessions manager for relay.
    /// Not awaited and not retried.
    fn broadcast_transaction_set(&self, transactions: Vec<Transaction>) {
        SessionsManager::from_registry().do_send(Broadcast {
            command: Command::TransactionSet(transactions),
        });
    }
}
