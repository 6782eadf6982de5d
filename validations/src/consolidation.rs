use itertools::Itertools;

use basalt_data_structures::{
    chain::{Block, ChainState, Hashable, BLOCK_SIZE_LIMIT},
    error::BlockError,
    utxo_pool::Diff,
};

use crate::validations::validate_transaction_set;

/// Validate a block as the next tip of the chain and return the diff
/// its transactions produce. Proof-of-work and difficulty are not
/// checked by this node.
pub fn validate_block(block: &Block, chain_state: &ChainState) -> Result<Diff, BlockError> {
    let tip = chain_state.highest_block_checkpoint;
    let beacon = block.block_header.beacon;

    if beacon.checkpoint != tip.checkpoint + 1 {
        return Err(BlockError::WrongCheckpoint {
            current: tip.checkpoint,
            found: beacon.checkpoint,
        });
    }
    if beacon.hash_prev_block != tip.hash_prev_block {
        return Err(BlockError::UnknownParent {
            expected: tip.hash_prev_block,
            found: beacon.hash_prev_block,
        });
    }

    let size = block.encoded_size();
    if size > BLOCK_SIZE_LIMIT {
        return Err(BlockError::ExceedsSizeLimit {
            size,
            limit: BLOCK_SIZE_LIMIT,
        });
    }

    if block.block_header.txns_root != Block::calculate_txns_root(&block.txns) {
        return Err(BlockError::WrongTransactionsRoot);
    }
    // The root is a flat hash over ids, so it cannot catch a repeated
    // transaction on its own
    if !block.txns.iter().map(Hashable::hash).all_unique() {
        return Err(BlockError::RepeatedTransaction);
    }

    let diff = validate_transaction_set(
        &block.txns,
        &chain_state.unspent_outputs_pool,
        &chain_state.storage_contracts,
        beacon.checkpoint,
    )?;
    log::debug!(
        "block {} validated: {} transactions, {} bytes",
        block.hash(),
        block.txns.len(),
        size
    );

    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_data_structures::{
        chain::{calculate_sha256, BlockHeader, CheckpointBeacon, OutputPointer},
        coin::Coin,
        transaction::{CoinOutput, Input, Transaction},
    };

    fn genesis_state() -> ChainState {
        let mut chain_state = ChainState::default();
        chain_state.unspent_outputs_pool.insert(
            OutputPointer {
                transaction_id: calculate_sha256(b"genesis"),
                output_index: 0,
            },
            CoinOutput {
                value: Coin::from_motes(1_000),
                ..CoinOutput::default()
            },
            0,
        );

        chain_state
    }

    fn block_on_top_of(chain_state: &ChainState, txns: Vec<Transaction>) -> Block {
        let tip = chain_state.highest_block_checkpoint;
        let txns_root = Block::calculate_txns_root(&txns);

        Block {
            block_header: BlockHeader {
                version: 0,
                beacon: CheckpointBeacon {
                    checkpoint: tip.checkpoint + 1,
                    hash_prev_block: tip.hash_prev_block,
                },
                txns_root,
                nonce: 0,
                timestamp: 0,
            },
            txns,
        }
    }

    fn spend_genesis() -> Transaction {
        Transaction {
            coin_inputs: vec![Input::new(OutputPointer {
                transaction_id: calculate_sha256(b"genesis"),
                output_index: 0,
            })],
            coin_outputs: vec![CoinOutput {
                value: Coin::from_motes(1_000),
                ..CoinOutput::default()
            }],
            ..Transaction::default()
        }
    }

    #[test]
    fn valid_block_produces_a_diff() {
        let chain_state = genesis_state();
        let txn = spend_genesis();
        let block = block_on_top_of(&chain_state, vec![txn.clone()]);

        let diff = validate_block(&block, &chain_state).unwrap();
        assert!(diff.spends_utxo(txn.coin_inputs[0].output_pointer()));
    }

    #[test]
    fn wrong_parent_is_rejected() {
        let chain_state = genesis_state();
        let mut block = block_on_top_of(&chain_state, vec![]);
        block.block_header.beacon.hash_prev_block = calculate_sha256(b"fork");

        assert!(matches!(
            validate_block(&block, &chain_state),
            Err(BlockError::UnknownParent { .. })
        ));
    }

    #[test]
    fn wrong_checkpoint_is_rejected() {
        let chain_state = genesis_state();
        let mut block = block_on_top_of(&chain_state, vec![]);
        block.block_header.beacon.checkpoint += 1;

        assert_eq!(
            validate_block(&block, &chain_state),
            Err(BlockError::WrongCheckpoint {
                current: 0,
                found: 2,
            })
        );
    }

    #[test]
    fn tampered_transaction_list_is_rejected() {
        let chain_state = genesis_state();
        let mut block = block_on_top_of(&chain_state, vec![]);
        block.txns.push(spend_genesis());

        assert_eq!(
            validate_block(&block, &chain_state),
            Err(BlockError::WrongTransactionsRoot)
        );
    }

    #[test]
    fn block_spending_unknown_output_is_rejected() {
        let chain_state = ChainState::default();
        let block = block_on_top_of(&chain_state, vec![spend_genesis()]);

        assert!(matches!(
            validate_block(&block, &chain_state),
            Err(BlockError::InvalidTransactions(_))
        ));
    }
}
