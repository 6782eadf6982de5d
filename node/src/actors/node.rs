use std::sync::{Arc, Mutex};

use actix::{Actor, System, SystemRegistry};

use basalt_config::config::Config;

use crate::actors::{
    chain_manager::ChainManager, json_rpc::JsonRpcServer, sessions_manager::SessionsManager,
};

// Handle of the running system, so that `close` works from any thread
// (interrupt handlers run outside the actix threads)
static RUNNING_SYSTEM: Mutex<Option<System>> = Mutex::new(None);

/// Function to run the main system
pub fn run(config: Arc<Config>, callback: fn()) -> Result<(), anyhow::Error> {
    // Init system
    let system = System::new();

    // Init actors
    system.block_on(async {
        if let Ok(mut handle) = RUNNING_SYSTEM.lock() {
            *handle = Some(System::current());
        }

        // Call cb function (register interrupt handlers)
        callback();

        // Start ChainManager actor
        let chain_manager_addr = ChainManager::from_config(&config).start();
        SystemRegistry::set(chain_manager_addr);

        // Start SessionsManager actor
        let sessions_manager_addr = SessionsManager::from_config(&config).start();
        SystemRegistry::set(sessions_manager_addr);

        // Start JSON RPC server
        let json_rpc_server_addr = JsonRpcServer::from_config(&config).start();
        SystemRegistry::set(json_rpc_server_addr);
    });

    // Run system
    system.run().map_err(anyhow::Error::from)
}

/// Function to close the main system
pub fn close() {
    log::info!("Closing node");

    match RUNNING_SYSTEM.lock() {
        Ok(handle) => match handle.as_ref() {
            Some(system) => system.stop(),
            None => log::warn!("No running system to close"),
        },
        Err(e) => log::error!("Could not reach the running system: {}", e),
    }
}
