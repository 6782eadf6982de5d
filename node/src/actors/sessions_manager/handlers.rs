use actix::prelude::*;
use tokio::net::TcpStream;

use basalt_data_structures::{chain::SetId, transaction::transaction_set_id, types::Command};

use super::{SessionInfo, SessionsManager};
use crate::actors::{
    messages::{
        Broadcast, Consolidate, InboundTcpConnect, NumSessions, OutboundTcpConnect, Register,
        SendCommand, SessionsCount, Unregister,
    },
    session::{SessionStatus, SessionType},
};

/// Handler for InboundTcpConnect messages (built from inbound connections)
impl Handler<InboundTcpConnect> for SessionsManager {
    type Result = ();

    fn handle(&mut self, msg: InboundTcpConnect, _ctx: &mut Self::Context) {
        if self.num_inbound_sessions() >= usize::from(self.inbound_limit) {
            log::warn!(
                "Rejecting inbound connection: limit of {} sessions reached",
                self.inbound_limit
            );
            // Dropping the stream closes the connection
            return;
        }
        self.create_session(msg.stream, SessionType::Inbound);
    }
}

/// Handler for OutboundTcpConnect messages: dial a peer
impl Handler<OutboundTcpConnect> for SessionsManager {
    type Result = ();

    fn handle(&mut self, msg: OutboundTcpConnect, ctx: &mut Self::Context) {
        if self.sessions.contains_key(&msg.address) {
            return;
        }
        let address = msg.address;

        async move { TcpStream::connect(address).await }
            .into_actor(self)
            .map(move |res, act, _ctx| match res {
                Ok(stream) => act.create_session(stream, SessionType::Outbound),
                Err(e) => log::debug!("Failed to connect to peer {}: {}", address, e),
            })
            .spawn(ctx);
    }
}

/// Handler for Register message.
impl Handler<Register> for SessionsManager {
    type Result = Result<(), ()>;

    fn handle(&mut self, msg: Register, _ctx: &mut Self::Context) -> Self::Result {
        if self.sessions.contains_key(&msg.address) {
            log::warn!("Session {} is already registered", msg.address);
            return Err(());
        }
        self.sessions.insert(
            msg.address,
            SessionInfo {
                actor: msg.actor,
                session_type: msg.session_type,
                status: SessionStatus::Unconsolidated,
            },
        );
        log::debug!(
            "Session (type {:?}) registered for peer {}",
            msg.session_type,
            msg.address
        );

        Ok(())
    }
}

/// Handler for Unregister message.
impl Handler<Unregister> for SessionsManager {
    type Result = ();

    fn handle(&mut self, msg: Unregister, _ctx: &mut Self::Context) {
        if self.sessions.remove(&msg.address).is_some() {
            log::debug!("Session unregistered for peer {}", msg.address);
        }
    }
}

/// Handler for Consolidate message: the session completed its handshake
impl Handler<Consolidate> for SessionsManager {
    type Result = ();

    fn handle(&mut self, msg: Consolidate, _ctx: &mut Self::Context) {
        match self.sessions.get_mut(&msg.address) {
            Some(info) => {
                info.status = SessionStatus::Consolidated;
            }
            None => {
                log::warn!("Cannot consolidate unknown session {}", msg.address);
            }
        }
    }
}

/// Handler for Broadcast message: fan a command out to every
/// consolidated session
impl Handler<Broadcast> for SessionsManager {
    type Result = ();

    fn handle(&mut self, msg: Broadcast, _ctx: &mut Self::Context) {
        // Transaction set relays loop through the network; the cache
        // cuts the echo once this node has relayed a set
        if let Command::TransactionSet(transactions) = &msg.command {
            let set_id: SetId = transaction_set_id(transactions);
            if self.recently_relayed.contains_key(&set_id) {
                log::trace!("Skipping re-broadcast of transaction set {}", set_id);
                return;
            }
            self.recently_relayed.insert(set_id, ());
        }

        let mut receivers = 0;
        for info in self
            .sessions
            .values()
            .filter(|info| info.status == SessionStatus::Consolidated)
        {
            info.actor.do_send(SendCommand {
                command: msg.command.clone(),
            });
            receivers += 1;
        }
        log::debug!("Broadcast {} command to {} sessions", msg.command, receivers);
    }
}

/// Handler for NumSessions message
impl Handler<NumSessions> for SessionsManager {
    type Result = Result<SessionsCount, ()>;

    fn handle(&mut self, _msg: NumSessions, _ctx: &mut Self::Context) -> Self::Result {
        Ok(SessionsCount {
            inbound: self.num_inbound_sessions(),
            outbound: self.num_outbound_sessions(),
        })
    }
}
