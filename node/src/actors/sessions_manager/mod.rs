//! # SessionsManager actor
//!
//! Registry of the peer sessions of this node. It owns the P2P server
//! socket, dials the configured peers, keeps one [`Session`] actor per
//! live connection and fans broadcast commands out to every
//! consolidated session, deduplicating transaction set relays with a
//! bounded FIFO cache.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use actix::prelude::*;
use ansi_term::Color::Cyan;
use tokio::net::{TcpListener, TcpStream};

use basalt_config::config::Config;
use basalt_data_structures::{cache::FifoMap, chain::SetId};

use crate::actors::{
    messages::InboundTcpConnect,
    session::{Session, SessionStatus, SessionType},
};

mod actor;
mod handlers;

/// Number of recently relayed transaction set ids kept to stop
/// re-broadcast loops between peers
pub const RELAY_CACHE_SIZE: usize = 256;

/// Period between attempts to dial missing configured peers
const BOOTSTRAP_RETRY_PERIOD: Duration = Duration::from_secs(30);

/// Everything the manager knows about one live session
pub struct SessionInfo {
    /// Address of the session actor
    pub actor: Addr<Session>,
    /// Session type
    pub session_type: SessionType,
    /// Session status
    pub status: SessionStatus,
}

/// SessionsManager actor
pub struct SessionsManager {
    /// Registered sessions
    sessions: HashMap<SocketAddr, SessionInfo>,
    /// Magic number of the network
    magic: u16,
    /// Maximum number of inbound sessions
    inbound_limit: u16,
    /// Peers to keep outbound sessions with
    known_peers: Vec<SocketAddr>,
    /// Handshake timeout for new sessions
    handshake_timeout: Duration,
    /// Relay read deadline for consolidated sessions
    relay_timeout: Duration,
    /// Server socket address
    server_addr: SocketAddr,
    /// Identifiers of recently relayed transaction sets
    recently_relayed: FifoMap<SetId, ()>,
}

impl Default for SessionsManager {
    fn default() -> Self {
        let defaults = Config::default();

        SessionsManager {
            sessions: HashMap::default(),
            magic: defaults.connections.magic,
            inbound_limit: defaults.connections.inbound_limit,
            known_peers: vec![],
            handshake_timeout: defaults.connections.handshake_timeout,
            relay_timeout: defaults.connections.relay_timeout,
            server_addr: defaults.connections.server_addr,
            recently_relayed: FifoMap::with_capacity(RELAY_CACHE_SIZE),
        }
    }
}

/// Required trait for being able to retrieve SessionsManager address from registry
impl Supervised for SessionsManager {}

/// Required trait for being able to retrieve SessionsManager address from registry
impl SystemService for SessionsManager {}

/// Auxiliary methods for SessionsManager actor
impl SessionsManager {
    /// Build a SessionsManager from the node configuration
    pub fn from_config(config: &Arc<Config>) -> Self {
        SessionsManager {
            sessions: HashMap::default(),
            magic: config.connections.magic,
            inbound_limit: config.connections.inbound_limit,
            known_peers: config.connections.known_peers.iter().copied().collect(),
            handshake_timeout: config.connections.handshake_timeout,
            relay_timeout: config.connections.relay_timeout,
            server_addr: config.connections.server_addr,
            recently_relayed: FifoMap::with_capacity(RELAY_CACHE_SIZE),
        }
    }

    /// Number of registered inbound sessions
    pub fn num_inbound_sessions(&self) -> usize {
        self.sessions
            .values()
            .filter(|info| info.session_type == SessionType::Inbound)
            .count()
    }

    /// Number of registered outbound sessions
    pub fn num_outbound_sessions(&self) -> usize {
        self.sessions
            .values()
            .filter(|info| info.session_type == SessionType::Outbound)
            .count()
    }

    /// Bind the P2P server socket and feed inbound connections into
    /// this actor as `InboundTcpConnect` messages
    fn start_server(&mut self, ctx: &mut Context<Self>) {
        let server_addr = self.server_addr;

        async move { TcpListener::bind(server_addr).await }
            .into_actor(self)
            .map(move |listener, _act, ctx| match listener {
                Ok(listener) => {
                    let stream = async_stream::stream! {
                        loop {
                            match listener.accept().await {
                                Ok((stream, _addr)) => yield InboundTcpConnect::new(stream),
                                Err(err) => log::error!("Error in incoming listener: {}", err),
                            }
                        }
                    };
                    ctx.add_message_stream(stream);
                    log::info!("P2P server has been started at {}", server_addr);
                }
                Err(e) => {
                    log::error!("Could not start P2P server at {}: {}", server_addr, e);
                }
            })
            .wait(ctx);
    }

    /// Periodically dial every configured peer this node has no
    /// session with
    fn bootstrap_peers(&self, ctx: &mut Context<Self>) {
        ctx.run_later(BOOTSTRAP_RETRY_PERIOD, move |act, ctx| {
            log::debug!(
                "{} Inbound: {} | Outbound: {}",
                Cyan.bold().paint("[Sessions]"),
                act.num_inbound_sessions(),
                act.num_outbound_sessions(),
            );
            for address in &act.known_peers {
                if !act.sessions.contains_key(address) {
                    ctx.notify(crate::actors::messages::OutboundTcpConnect { address: *address });
                }
            }
            act.bootstrap_peers(ctx);
        });
    }

    /// Wrap a fresh TCP stream into a `Session` actor
    fn create_session(&mut self, stream: TcpStream, session_type: SessionType) {
        let remote_addr = match stream.peer_addr() {
            Ok(remote_addr) => remote_addr,
            Err(e) => {
                log::warn!("Dropping connection without peer address: {}", e);
                return;
            }
        };
        let magic = self.magic;
        let handshake_timeout = self.handshake_timeout;
        let relay_timeout = self.relay_timeout;

        Session::create(move |ctx| {
            // Split TCP stream into read and write parts
            let (r, w) = stream.into_split();

            // Add stream in session actor from the read part of the tcp stream
            Session::add_stream(
                tokio_util::codec::FramedRead::new(r, crate::actors::codec::P2PCodec),
                ctx,
            );

            // Create the session actor and store in its state the write part of the tcp stream
            Session::new(
                remote_addr,
                session_type,
                actix::io::FramedWrite::new(w, crate::actors::codec::P2PCodec, ctx),
                magic,
                handshake_timeout,
                relay_timeout,
            )
        });
    }
}
