use std::fmt;

use actix::{MailboxError, SystemService};
use jsonrpc_core::{IoHandler, Params, Value};
use serde_json::json;

use basalt_data_structures::{
    chain::Hashable, error::TransactionPoolError, transaction::Transaction,
};

use crate::actors::{
    chain_manager::ChainManager,
    messages::{AddTransactionSet, GetMempool, GetNodeStats, NumSessions},
    sessions_manager::SessionsManager,
};

/// Define the JSON-RPC interface:
/// All the methods available through JSON-RPC
pub fn jsonrpc_io_handler() -> IoHandler {
    let mut io = IoHandler::default();

    io.add_method("submitTransactionSet", |params: Params| {
        submit_transaction_set(params.parse())
    });
    io.add_method("getMempool", |_params: Params| get_mempool());
    io.add_method("nodeStats", |_params: Params| node_stats());

    io
}

fn internal_error<T: fmt::Display>(e: T) -> jsonrpc_core::Error {
    jsonrpc_core::Error {
        code: jsonrpc_core::ErrorCode::InternalError,
        message: e.to_string(),
        data: None,
    }
}

fn unreachable_error(e: MailboxError) -> jsonrpc_core::Error {
    log::error!("Failed to reach ChainManager: {}", e);

    internal_error(TransactionPoolError::ResourceUnavailable)
}

/// Submit a candidate transaction set to the local admission pipeline.
///
/// The error of a rejected candidate is surfaced directly to the
/// caller; on success the response carries the identifiers of the
/// minimum set relayed to the network on the caller's behalf.
async fn submit_transaction_set(
    params: Result<(Vec<Transaction>,), jsonrpc_core::Error>,
) -> Result<Value, jsonrpc_core::Error> {
    let (transactions,) = params?;

    let chain_manager = ChainManager::from_registry();
    match chain_manager.send(AddTransactionSet { transactions }).await {
        Ok(Ok(minimum)) => {
            let transactions: Vec<String> = minimum
                .iter()
                .map(|txn| txn.hash().to_string())
                .collect();

            Ok(json!({
                "accepted": true,
                "relayed_transactions": transactions,
            }))
        }
        Ok(Err(e)) => Err(internal_error(e)),
        Err(e) => Err(unreachable_error(e)),
    }
}

/// Listing of the transaction pool
async fn get_mempool() -> Result<Value, jsonrpc_core::Error> {
    let chain_manager = ChainManager::from_registry();
    match chain_manager.send(GetMempool).await {
        Ok(Ok(mempool)) => serde_json::to_value(mempool).map_err(internal_error),
        Ok(Err(())) => Err(internal_error("could not list the transaction pool")),
        Err(e) => Err(unreachable_error(e)),
    }
}

/// Node status counters: chain tip, ledger sizes, pool occupancy,
/// admission price and live sessions
async fn node_stats() -> Result<Value, jsonrpc_core::Error> {
    let chain_manager = ChainManager::from_registry();
    let stats = match chain_manager.send(GetNodeStats).await {
        Ok(Ok(stats)) => stats,
        Ok(Err(())) => return Err(internal_error("could not collect node stats")),
        Err(e) => return Err(unreachable_error(e)),
    };

    let sessions = SessionsManager::from_registry()
        .send(NumSessions)
        .await
        .map_err(unreachable_error)?
        .unwrap_or_default();

    let mut value = serde_json::to_value(stats).map_err(internal_error)?;
    if let Value::Object(map) = &mut value {
        map.insert("sessions".to_string(), json!(sessions));
    }

    Ok(value)
}
