use actix::prelude::*;
use itertools::Itertools;

use basalt_data_structures::{chain::Hashable, transaction::transaction_set_size};

use super::ChainManager;
use crate::actors::messages::{
    AddBlock, AddTransactionSet, GetHighestCheckpointBeacon, GetMempool, GetNodeStats, MempoolInfo,
    NodeStats, TransactionSetInfo,
};

////////////////////////////////////////////////////////////////////////////////////////
// ACTOR MESSAGE HANDLERS
////////////////////////////////////////////////////////////////////////////////////////

/// Handler for AddTransactionSet message
impl Handler<AddTransactionSet> for ChainManager {
    type Result = <AddTransactionSet as Message>::Result;

    fn handle(&mut self, msg: AddTransactionSet, _ctx: &mut Context<Self>) -> Self::Result {
        match self.add_transaction_set(msg.transactions) {
            Ok(minimum) => {
                // Relay the admitted set to the network. Not awaited:
                // admission does not depend on propagation.
                self.broadcast_transaction_set(minimum.clone());

                Ok(minimum)
            }
            Err(e) => {
                log::debug!("Transaction set rejected: {e}");

                Err(e)
            }
        }
    }
}

/// Handler for AddBlock message
impl Handler<AddBlock> for ChainManager {
    type Result = <AddBlock as Message>::Result;

    fn handle(&mut self, msg: AddBlock, _ctx: &mut Context<Self>) -> Self::Result {
        match self.process_block(&msg.block) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::debug!("Block rejected: {e}");

                Err(e)
            }
        }
    }
}

/// Handler for GetHighestBlockCheckpoint message
impl Handler<GetHighestCheckpointBeacon> for ChainManager {
    type Result = <GetHighestCheckpointBeacon as Message>::Result;

    fn handle(
        &mut self,
        _msg: GetHighestCheckpointBeacon,
        _ctx: &mut Context<Self>,
    ) -> Self::Result {
        Ok(self.get_chain_beacon())
    }
}

/// Handler for GetMempool message
impl Handler<GetMempool> for ChainManager {
    type Result = <GetMempool as Message>::Result;

    fn handle(&mut self, _msg: GetMempool, _ctx: &mut Context<Self>) -> Self::Result {
        let transaction_sets = self
            .transactions_pool
            .sorted_set_ids()
            .into_iter()
            .filter_map(|set_id| {
                self.transactions_pool.get(&set_id).map(|txns| {
                    TransactionSetInfo {
                        set_id: set_id.to_string(),
                        transactions: txns
                            .iter()
                            .map(|txn| txn.hash().to_string())
                            .collect_vec(),
                        size: transaction_set_size(txns),
                    }
                })
            })
            .collect_vec();

        Ok(MempoolInfo {
            total_bytes: self.transactions_pool.total_bytes(),
            transaction_sets,
        })
    }
}

/// Handler for GetNodeStats message
impl Handler<GetNodeStats> for ChainManager {
    type Result = <GetNodeStats as Message>::Result;

    fn handle(&mut self, _msg: GetNodeStats, _ctx: &mut Context<Self>) -> Self::Result {
        let beacon = self.get_chain_beacon();

        Ok(NodeStats {
            epoch: beacon.checkpoint,
            tip: beacon.hash_prev_block.to_string(),
            utxos: self.chain_state.unspent_outputs_pool.len(),
            storage_contracts: self.chain_state.storage_contracts.len(),
            pool_sets: self.transactions_pool.len(),
            pool_transactions: self.transactions_pool.transaction_count(),
            pool_bytes: self.transactions_pool.total_bytes(),
            required_fee_per_byte: self.transactions_pool.required_fee_per_byte().as_f64(),
        })
    }
}
