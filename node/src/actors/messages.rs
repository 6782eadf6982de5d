use std::net::SocketAddr;

use actix::{Addr, Message};
use serde::Serialize;
use tokio::net::TcpStream;

use basalt_data_structures::{
    chain::{Block, CheckpointBeacon},
    error::{BlockError, TransactionPoolError},
    transaction::Transaction,
    types::Command,
};

use super::session::{Session, SessionType};

////////////////////////////////////////////////////////////////////////////////////////
// MESSAGES TO CHAIN MANAGER
////////////////////////////////////////////////////////////////////////////////////////

/// Message result of unit
pub type SessionUnitResult = ();

/// Submit a candidate transaction set to the admission pipeline.
///
/// On success the result carries the minimum subset of the admitted
/// set (which may be a superset of the candidate) that peers need in
/// order to accept the candidate themselves.
pub struct AddTransactionSet {
    /// Ordered candidate transactions
    pub transactions: Vec<Transaction>,
}

impl Message for AddTransactionSet {
    type Result = Result<Vec<Transaction>, TransactionPoolError>;
}

/// Process a block received from a peer as the next chain tip
pub struct AddBlock {
    /// Block
    pub block: Block,
}

impl Message for AddBlock {
    type Result = Result<(), BlockError>;
}

/// Message to obtain the highest block checkpoint managed by the
/// `ChainManager` actor.
pub struct GetHighestCheckpointBeacon;

impl Message for GetHighestCheckpointBeacon {
    type Result = Result<CheckpointBeacon, ()>;
}

/// Ask for a listing of the transaction pool
pub struct GetMempool;

impl Message for GetMempool {
    type Result = Result<MempoolInfo, ()>;
}

/// One pooled transaction set, as reported over JSON-RPC
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TransactionSetInfo {
    /// Identifier of the set
    pub set_id: String,
    /// Identifiers of the transactions of the set, in dependency order
    pub transactions: Vec<String>,
    /// Canonical size of the set, in bytes
    pub size: u64,
}

/// Transaction pool listing
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MempoolInfo {
    /// Sum of the canonical sizes of all pooled sets
    pub total_bytes: u64,
    /// Every pooled set, sorted by identifier
    pub transaction_sets: Vec<TransactionSetInfo>,
}

/// Ask for node status counters
pub struct GetNodeStats;

impl Message for GetNodeStats {
    type Result = Result<NodeStats, ()>;
}

/// Node status counters
#[derive(Clone, Debug, Serialize)]
pub struct NodeStats {
    /// Epoch of the chain tip
    pub epoch: u32,
    /// Hash of the chain tip
    pub tip: String,
    /// Number of unspent outputs in the ledger
    pub utxos: usize,
    /// Number of live storage contracts in the ledger
    pub storage_contracts: usize,
    /// Number of pooled transaction sets
    pub pool_sets: usize,
    /// Number of pooled transactions
    pub pool_transactions: usize,
    /// Byte occupancy of the pool
    pub pool_bytes: u64,
    /// Current admission price, in motes per byte
    pub required_fee_per_byte: f64,
}

////////////////////////////////////////////////////////////////////////////////////////
// MESSAGES TO SESSIONS MANAGER
////////////////////////////////////////////////////////////////////////////////////////

/// Message to indicate that a new session is created
pub struct Register {
    /// Socket address of the session
    pub address: SocketAddr,
    /// Address of the session actor
    pub actor: Addr<Session>,
    /// Session type
    pub session_type: SessionType,
}

impl Message for Register {
    type Result = Result<(), ()>;
}

/// Message to indicate that a session is disconnected
pub struct Unregister {
    /// Socket address of the session
    pub address: SocketAddr,
}

impl Message for Unregister {
    type Result = SessionUnitResult;
}

/// Message to indicate that a session completed the handshake
pub struct Consolidate {
    /// Socket address of the session
    pub address: SocketAddr,
}

impl Message for Consolidate {
    type Result = SessionUnitResult;
}

/// Message to broadcast a command to every consolidated session.
/// Fire-and-forget: delivery is not awaited nor retried.
pub struct Broadcast {
    /// Protocol command to relay
    pub command: Command,
}

impl Message for Broadcast {
    type Result = SessionUnitResult;
}

/// Actor message that holds an inbound TCP stream
pub struct InboundTcpConnect {
    /// Tcp stream of the inbound connections
    pub stream: TcpStream,
}

impl InboundTcpConnect {
    /// Method to create a new InboundTcpConnect message from a TCP stream
    pub fn new(stream: TcpStream) -> InboundTcpConnect {
        InboundTcpConnect { stream }
    }
}

impl Message for InboundTcpConnect {
    type Result = SessionUnitResult;
}

/// Actor message to request a new outbound TCP connection to a peer
pub struct OutboundTcpConnect {
    /// Address of the outbound connection
    pub address: SocketAddr,
}

impl Message for OutboundTcpConnect {
    type Result = SessionUnitResult;
}

/// Ask for the number of live sessions
pub struct NumSessions;

impl Message for NumSessions {
    type Result = Result<SessionsCount, ()>;
}

/// Number of live sessions by type
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SessionsCount {
    /// Consolidated inbound sessions
    pub inbound: usize,
    /// Consolidated outbound sessions
    pub outbound: usize,
}

////////////////////////////////////////////////////////////////////////////////////////
// MESSAGES TO SESSION
////////////////////////////////////////////////////////////////////////////////////////

/// Message to send a protocol command through a session
pub struct SendCommand {
    /// Protocol command to send
    pub command: Command,
}

impl Message for SendCommand {
    type Result = SessionUnitResult;
}
