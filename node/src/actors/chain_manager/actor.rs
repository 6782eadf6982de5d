use actix::prelude::*;

use super::ChainManager;

/// Implement Actor trait for `ChainManager`
impl Actor for ChainManager {
    /// Every actor has to provide execution `Context` in which it can run
    type Context = Context<Self>;

    /// Method to be executed when the actor is started
    fn started(&mut self, _ctx: &mut Self::Context) {
        log::debug!("ChainManager actor has been started!");
        log::info!(
            "Chain tip at epoch {}, {} unspent outputs, {} storage contracts",
            self.chain_state.block_epoch(),
            self.chain_state.unspent_outputs_pool.len(),
            self.chain_state.storage_contracts.len(),
        );
    }
}
