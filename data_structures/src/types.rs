use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    chain::{Block, CheckpointBeacon},
    transaction::Transaction,
};

/// Protocol version spoken by this node
pub const PROTOCOL_VERSION: u32 = 1;

/// Message exchanged between peers over a framed TCP connection
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Network magic number, rejects cross-network chatter
    pub magic: u16,
    pub kind: Command,
}

/// Commands of the peer protocol
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Version(Version),
    Verack(Verack),
    TransactionSet(Vec<Transaction>),
    Block(Block),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Version(_) => f.write_str("VERSION"),
            Command::Verack(_) => f.write_str("VERACK"),
            Command::TransactionSet(_) => f.write_str("TRANSACTION_SET"),
            Command::Block(_) => f.write_str("BLOCK"),
        }
    }
}

/// First message of the handshake
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub version: u32,
    /// Wall-clock timestamp of the sender
    pub timestamp: i64,
    /// Highest consolidated block of the sender
    pub beacon: CheckpointBeacon,
}

/// Handshake acknowledgement
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Verack;

impl Message {
    pub fn build_version(magic: u16, timestamp: i64, beacon: CheckpointBeacon) -> Message {
        Message {
            magic,
            kind: Command::Version(Version {
                version: PROTOCOL_VERSION,
                timestamp,
                beacon,
            }),
        }
    }

    pub fn build_verack(magic: u16) -> Message {
        Message {
            magic,
            kind: Command::Verack(Verack),
        }
    }

    pub fn build_transaction_set(magic: u16, transactions: Vec<Transaction>) -> Message {
        Message {
            magic,
            kind: Command::TransactionSet(transactions),
        }
    }

    pub fn build_block(magic: u16, block: Block) -> Message {
        Message {
            magic,
            kind: Command::Block(block),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_bincode_round_trip() {
        let msg = Message::build_verack(0x5442);
        let bytes = bincode::serialize(&msg).unwrap();
        let decoded: Message = bincode::deserialize(&bytes).unwrap();

        assert_eq!(decoded, msg);
        assert_eq!(decoded.kind.to_string(), "VERACK");
    }
}
