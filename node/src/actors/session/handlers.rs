use std::{io::Error, time::Instant};

use actix::{
    io::WriteHandler, ActorContext, ActorFutureExt, Context, ContextFutureSpawner, Handler,
    StreamHandler, SystemService, WrapFuture,
};
use ansi_term::Color::Green;
use bytes::BytesMut;

use basalt_data_structures::{
    chain::Block,
    error::{BlockError, TransactionPoolError},
    transaction::Transaction,
    types::{Command, Message as BasaltMessage, Version},
};

use super::{Session, SessionStatus, SessionType};
use crate::actors::{
    chain_manager::ChainManager,
    messages::{AddBlock, AddTransactionSet, Consolidate, SendCommand},
    sessions_manager::SessionsManager,
};

/// Implement WriteHandler for Session
impl WriteHandler<Error> for Session {}

/// Implement `StreamHandler` trait in order to use `Framed` with an actor
impl StreamHandler<Result<BytesMut, Error>> for Session {
    /// This is the main event loop for messages coming from the peer
    fn handle(&mut self, result: Result<BytesMut, Error>, ctx: &mut Self::Context) {
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(err) => {
                // Includes oversize frames rejected by the codec
                log::error!(
                    "Error in session stream from peer {:?}: {}",
                    self.remote_addr,
                    err
                );
                ctx.stop();
                return;
            }
        };
        self.last_activity = Instant::now();

        let msg: BasaltMessage = match bincode::deserialize(&bytes) {
            Ok(msg) => msg,
            Err(err) => {
                log::error!("Error decoding message: {:?}", err);
                ctx.stop();
                return;
            }
        };
        log::debug!(
            "{} Received {} message from session {:?} ({} bytes)",
            Green.bold().paint("[<]"),
            Green.bold().paint(msg.kind.to_string()),
            self.remote_addr,
            bytes.len(),
        );
        log::trace!("\t{:?}", msg);

        if msg.magic != self.magic_number {
            log::error!(
                "Mismatching network magic. Received: {:#06x}, ours: {:#06x}",
                msg.magic,
                self.magic_number
            );
            ctx.stop();
            return;
        }

        match (self.status, msg.kind) {
            ////////////////////
            //   HANDSHAKE    //
            ////////////////////
            (SessionStatus::Unconsolidated, Command::Version(version)) => {
                self.handshake_version(&version, ctx);
                self.try_consolidate(ctx);
            }
            (SessionStatus::Unconsolidated, Command::Verack(_)) => {
                self.handshake_flags.verack_rx = true;
                self.try_consolidate(ctx);
            }
            //////////////////////
            //   RELAY INGRESS  //
            //////////////////////
            (SessionStatus::Consolidated, Command::TransactionSet(transactions)) => {
                self.inbound_transaction_set(transactions, ctx);
            }
            (SessionStatus::Consolidated, Command::Block(block)) => {
                self.inbound_block(block, ctx);
            }
            /////////////////////
            // NOT SUPPORTED   //
            /////////////////////
            (status, kind) => {
                log::warn!(
                    "Received {} message from peer {:?} while in {:?} status, closing session",
                    kind,
                    self.remote_addr,
                    status,
                );
                ctx.stop();
            }
        }
    }

    /// The peer closed the connection
    fn finished(&mut self, ctx: &mut Self::Context) {
        log::debug!("Session stream from peer {:?} finished", self.remote_addr);
        ctx.stop();
    }
}

/// Handler for SendCommand message: relay egress
impl Handler<SendCommand> for Session {
    type Result = ();

    fn handle(&mut self, msg: SendCommand, _ctx: &mut Context<Self>) {
        let envelope = self.envelope(msg.command);
        self.send_message(envelope);
    }
}

impl Session {
    /// Process a version message: acknowledge it and, if this side did
    /// not open the handshake, answer with our own version
    fn handshake_version(&mut self, version: &Version, ctx: &mut Context<Session>) {
        log::debug!(
            "Peer {:?} runs protocol version {} with tip at epoch {}",
            self.remote_addr,
            version.version,
            version.beacon.checkpoint,
        );
        self.handshake_flags.version_rx = true;

        if let (SessionType::Inbound, false) =
            (self.session_type, self.handshake_flags.version_tx)
        {
            self.send_version(ctx);
        }
        let verack = self.envelope(Command::Verack(Default::default()));
        self.send_message(verack);
        self.handshake_flags.verack_tx = true;
    }

    /// Tell the SessionsManager this session completed the handshake
    pub(super) fn notify_consolidate(&self, _ctx: &mut Context<Session>) {
        SessionsManager::from_registry().do_send(Consolidate {
            address: self.remote_addr,
        });
    }

    /// Forward a relayed transaction set into the admission pipeline.
    ///
    /// An unacceptable set is surfaced as a connection-level failure:
    /// the session is closed without retrying or answering the peer.
    /// Duplicates are normal gossip and are ignored.
    fn inbound_transaction_set(
        &mut self,
        transactions: Vec<Transaction>,
        ctx: &mut Context<Session>,
    ) {
        ChainManager::from_registry()
            .send(AddTransactionSet { transactions })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(Ok(_minimum)) => {
                        // Admitted; the ChainManager hands the set to
                        // the SessionsManager for relay
                    }
                    Ok(Err(TransactionPoolError::DuplicateSet)) => {
                        log::debug!(
                            "Peer {:?} relayed an already known transaction set",
                            act.remote_addr
                        );
                    }
                    Ok(Err(e)) => {
                        log::warn!(
                            "Peer {:?} relayed an unacceptable transaction set ({}), closing session",
                            act.remote_addr,
                            e,
                        );
                        ctx.stop();
                    }
                    Err(e) => {
                        log::error!("Failed to reach ChainManager: {}", e);
                    }
                }

                actix::fut::ready(())
            })
            .spawn(ctx);
    }

    /// Forward a relayed block to the chain manager
    fn inbound_block(&mut self, block: Block, ctx: &mut Context<Session>) {
        ChainManager::from_registry()
            .send(AddBlock { block })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(Ok(())) => {}
                    Ok(Err(BlockError::KnownBlock)) => {
                        log::debug!("Peer {:?} relayed an already known block", act.remote_addr);
                    }
                    Ok(Err(BlockError::WrongCheckpoint { current, found })) => {
                        // Yet unsynchronized peers relay stale blocks;
                        // that is not a protocol violation
                        log::debug!(
                            "Peer {:?} relayed a block for epoch {} while the tip is at {}",
                            act.remote_addr,
                            found,
                            current,
                        );
                    }
                    Ok(Err(e)) => {
                        log::warn!(
                            "Peer {:?} relayed an invalid block ({}), closing session",
                            act.remote_addr,
                            e,
                        );
                        ctx.stop();
                    }
                    Err(e) => {
                        log::error!("Failed to reach ChainManager: {}", e);
                    }
                }

                actix::fut::ready(())
            })
            .spawn(ctx);
    }
}
