use actix::prelude::*;

use super::SessionsManager;

/// Implement Actor trait for `SessionsManager`
impl Actor for SessionsManager {
    /// Every actor has to provide execution `Context` in which it can run
    type Context = Context<Self>;

    /// Method to be executed when the actor is started
    fn started(&mut self, ctx: &mut Self::Context) {
        log::debug!("SessionsManager actor has been started!");

        // Start the P2P server socket
        self.start_server(ctx);

        // Dial the configured peers right away, then keep retrying
        // periodically
        for address in self.known_peers.clone() {
            ctx.notify(crate::actors::messages::OutboundTcpConnect { address });
        }
        self.bootstrap_peers(ctx);
    }
}
