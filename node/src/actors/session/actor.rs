use actix::{
    Actor, ActorContext, ActorFutureExt, AsyncContext, Context, ContextFutureSpawner, Running,
    SystemService, WrapFuture,
};

use super::{Session, SessionStatus, SessionType};
use crate::actors::{
    chain_manager::ChainManager,
    messages::{GetHighestCheckpointBeacon, Register, Unregister},
    sessions_manager::SessionsManager,
};

use basalt_data_structures::types::Message as BasaltMessage;

/// Implement actor trait for Session
impl Actor for Session {
    /// Every actor has to provide execution Context in which it can run.
    type Context = Context<Self>;

    /// Method to be executed when the actor is started
    fn started(&mut self, ctx: &mut Self::Context) {
        // Stop the session if it is still unconsolidated after the
        // handshake period
        ctx.run_later(self.handshake_timeout, |act, ctx| {
            if act.status != SessionStatus::Consolidated {
                log::info!(
                    "Handshake timeout expired, disconnecting session with peer {:?}",
                    act.remote_addr
                );
                ctx.stop();
            }
        });

        // Stop the session when no complete frame arrives for a whole
        // relay period. A hostile peer trickling bytes never completes
        // a frame, so this is the read deadline of the relay ingress.
        ctx.run_interval(self.relay_timeout, |act, ctx| {
            if act.last_activity.elapsed() >= act.relay_timeout {
                log::info!(
                    "No message from peer {:?} within {:?}, disconnecting",
                    act.remote_addr,
                    act.relay_timeout
                );
                ctx.stop();
            }
        });

        // Register self in SessionsManager. `AsyncContext::wait`
        // registers the future within the context, and the context
        // waits until it resolves before processing any other event.
        SessionsManager::from_registry()
            .send(Register {
                address: self.remote_addr,
                actor: ctx.address(),
                session_type: self.session_type,
            })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(Ok(())) => {
                        log::debug!(
                            "Session {:?} successfully registered in SessionsManager",
                            act.remote_addr
                        );
                    }
                    _ => {
                        log::error!(
                            "Session {:?} could not be registered, closing",
                            act.remote_addr
                        );
                        ctx.stop();
                    }
                }

                actix::fut::ready(())
            })
            .wait(ctx);

        // The dialing side opens the handshake
        if let SessionType::Outbound = self.session_type {
            self.send_version(ctx);
        }
    }

    /// Method to be executed when the actor is stopping
    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        SessionsManager::from_registry().do_send(Unregister {
            address: self.remote_addr,
        });

        Running::Stop
    }
}

impl Session {
    /// Ask the ChainManager for the current tip and send our version
    /// message with it
    pub(super) fn send_version(&mut self, ctx: &mut Context<Session>) {
        ChainManager::from_registry()
            .send(GetHighestCheckpointBeacon)
            .into_actor(self)
            .then(|res, act, _ctx| {
                match res {
                    Ok(Ok(beacon)) => {
                        let version = BasaltMessage::build_version(
                            act.magic_number,
                            super::current_timestamp(),
                            beacon,
                        );
                        act.send_message(version);
                        act.handshake_flags.version_tx = true;
                    }
                    error => {
                        log::error!("Current beacon could not be retrieved: {:?}", error);
                    }
                }

                actix::fut::ready(())
            })
            .wait(ctx);
    }
}
