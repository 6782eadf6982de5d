use std::{
    net::SocketAddr,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use actix::io::FramedWrite;
use ansi_term::Color::Green;
use bytes::BytesMut;
use tokio::net::tcp::OwnedWriteHalf;

use basalt_data_structures::types::{Command, Message as BasaltMessage};

use crate::actors::codec::P2PCodec;

mod actor;

mod handlers;

/// Session type: who dialed whom
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionType {
    /// The remote peer connected to our server socket
    Inbound,
    /// This node connected to the remote peer
    Outbound,
}

/// Session status
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionStatus {
    /// The handshake is not complete yet; only handshake commands are
    /// accepted and the session is dropped after a timeout
    Unconsolidated,
    /// The handshake completed and the session relays chain data
    Consolidated,
}

/// HandshakeFlags
#[derive(Default)]
struct HandshakeFlags {
    /// Flag to indicate that a version message was sent
    version_tx: bool,
    /// Flag to indicate that a version message was received
    version_rx: bool,
    /// Flag to indicate that a verack message was sent
    verack_tx: bool,
    /// Flag to indicate that a verack message was received
    verack_rx: bool,
}

/// HandshakeFlags helper methods
impl HandshakeFlags {
    // Auxiliary function to check if all flags are set to true
    fn all_true(&self) -> bool {
        self.verack_tx && self.verack_rx && self.version_tx && self.version_rx
    }
}

/// Session representing a TCP connection to a peer
pub struct Session {
    /// Remote socket address (remote server address only if outbound session)
    remote_addr: SocketAddr,

    /// Session type
    session_type: SessionType,

    /// Framed wrapper to send messages through the TCP connection
    framed: FramedWrite<BytesMut, OwnedWriteHalf, P2PCodec>,

    /// Session status
    status: SessionStatus,

    /// HandshakeFlags
    handshake_flags: HandshakeFlags,

    /// Magic number
    magic_number: u16,

    /// Time an unconsolidated session may take to finish the handshake
    handshake_timeout: Duration,

    /// Time a consolidated session may stay silent before being
    /// dropped. A peer feeding a frame byte by byte never completes a
    /// message, so this bounds how long it can hold the connection.
    relay_timeout: Duration,

    /// Instant of the last complete frame received from the peer
    last_activity: Instant,
}

/// Session helper methods
impl Session {
    /// Method to create a new session
    pub fn new(
        remote_addr: SocketAddr,
        session_type: SessionType,
        framed: FramedWrite<BytesMut, OwnedWriteHalf, P2PCodec>,
        magic_number: u16,
        handshake_timeout: Duration,
        relay_timeout: Duration,
    ) -> Session {
        Session {
            remote_addr,
            session_type,
            framed,
            status: SessionStatus::Unconsolidated,
            handshake_flags: HandshakeFlags::default(),
            magic_number,
            handshake_timeout,
            relay_timeout,
            last_activity: Instant::now(),
        }
    }

    /// Method to send a Basalt message to the remote peer
    fn send_message(&mut self, msg: BasaltMessage) {
        match bincode::serialize(&msg) {
            Ok(bytes) => {
                log::debug!(
                    "{} Sending {} message to session {:?} ({} bytes)",
                    Green.bold().paint("[>]"),
                    Green.bold().paint(msg.kind.to_string()),
                    self.remote_addr,
                    bytes.len(),
                );
                log::trace!("\t{:?}", msg);
                self.framed.write(BytesMut::from(bytes.as_slice()));
            }
            Err(e) => {
                log::error!(
                    "Error sending {} message to session {:?}: {}",
                    msg.kind,
                    self.remote_addr,
                    e,
                );
            }
        }
    }

    /// Build a protocol message carrying `command` with our magic
    fn envelope(&self, command: Command) -> BasaltMessage {
        BasaltMessage {
            magic: self.magic_number,
            kind: command,
        }
    }

    /// Complete the handshake once every flag is set
    fn try_consolidate(&mut self, ctx: &mut actix::Context<Self>) {
        if self.status == SessionStatus::Unconsolidated && self.handshake_flags.all_true() {
            self.status = SessionStatus::Consolidated;
            log::info!(
                "Session with peer {} consolidated ({:?})",
                self.remote_addr,
                self.session_type,
            );
            self.notify_consolidate(ctx);
        }
    }
}

/// Seconds since the unix epoch, as claimed in version messages
fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}
