//! # Config
//!
//! This module contains the `Config` struct, which holds all the
//! configuration params of a Basalt node. Every field has a default
//! (see [defaults](crate::defaults)), so a configuration file only
//! needs to declare the params it overrides, section by section.

use std::{collections::HashSet, net::SocketAddr, time::Duration};

use serde::{Deserialize, Deserializer};

use crate::defaults;

/// The total configuration object that contains all other, more
/// specific, configuration objects (connections, jsonrpc, mempool).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Connections-related configuration
    pub connections: Connections,

    /// JSON-RPC API configuration
    pub jsonrpc: JsonRPC,

    /// Transaction pool admission configuration
    pub mempool: Mempool,

    /// Premined coin allocations applied to an empty chain at startup
    pub genesis: Genesis,
}

/// Connection-specific configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Connections {
    /// Network magic number; peers with a different magic are dropped
    pub magic: u16,

    /// Server address, that is, the socket address (interface ip and
    /// port) to which the server accepting connections from other
    /// peers should bind to
    pub server_addr: SocketAddr,

    /// Maximum number of concurrent connections the server should
    /// accept
    pub inbound_limit: u16,

    /// Maximum number of opened connections to other peers this node
    /// (acting as a client) should maintain
    pub outbound_limit: u16,

    /// List of other peer addresses this node knows at start, it is
    /// used as a bootstrap mechanism to gain access to the P2P
    /// network
    pub known_peers: HashSet<SocketAddr>,

    /// Handshake timeout
    #[serde(
        deserialize_with = "from_secs",
        rename = "handshake_timeout_seconds"
    )]
    pub handshake_timeout: Duration,

    /// Time a consolidated session may stay silent before it is
    /// dropped. Bounds the damage a slow peer can do by feeding a
    /// relay frame byte by byte.
    #[serde(deserialize_with = "from_secs", rename = "relay_timeout_seconds")]
    pub relay_timeout: Duration,
}

impl Default for Connections {
    fn default() -> Self {
        Connections {
            magic: defaults::connections_magic(),
            server_addr: defaults::connections_server_addr(),
            inbound_limit: defaults::connections_inbound_limit(),
            outbound_limit: defaults::connections_outbound_limit(),
            known_peers: HashSet::default(),
            handshake_timeout: defaults::connections_handshake_timeout(),
            relay_timeout: defaults::connections_relay_timeout(),
        }
    }
}

fn from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// JsonRPC API configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct JsonRPC {
    /// Binary flag telling whether to enable the JSON-RPC interface or not
    pub enabled: bool,
    /// JSON-RPC server address, that is, the socket address (interface ip and
    /// port) for the JSON-RPC server
    pub server_address: SocketAddr,
}

impl Default for JsonRPC {
    fn default() -> Self {
        JsonRPC {
            enabled: defaults::jsonrpc_enabled(),
            server_address: defaults::jsonrpc_server_address(),
        }
    }
}

/// Transaction pool admission configuration. These params shape the
/// occupancy fee curve and the standardness limits of the node.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Mempool {
    /// Pool byte occupancy below which sets are admitted for free
    pub size_for_fee: u64,
    /// Soft target for the pool byte occupancy. Not a hard cap.
    pub size_target: u64,
    /// Exponent of the admission fee curve, must be greater than one
    pub fee_exponent: f64,
    /// Fee rate charged at the occupancy target, in motes per byte
    pub base_fee_per_byte: f64,
    /// Maximum canonical size of a single transaction, in bytes
    pub max_transaction_size: u64,
    /// Maximum canonical size of a transaction set, in bytes
    pub max_set_size: u64,
    /// Epochs an unconfirmed transaction may linger before the sets
    /// containing it are purged
    pub transaction_max_age: u32,
}

impl Default for Mempool {
    fn default() -> Self {
        Mempool {
            size_for_fee: defaults::mempool_size_for_fee(),
            size_target: defaults::mempool_size_target(),
            fee_exponent: defaults::mempool_fee_exponent(),
            base_fee_per_byte: defaults::mempool_base_fee_per_byte(),
            max_transaction_size: defaults::mempool_max_transaction_size(),
            max_set_size: defaults::mempool_max_set_size(),
            transaction_max_age: defaults::mempool_transaction_max_age(),
        }
    }
}

/// Premined coin allocations applied to an empty chain at startup,
/// so that a fresh network has spendable outputs before any block.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Genesis {
    pub allocations: Vec<GenesisAllocation>,
}

/// One premined output: a hex-encoded address and a value in motes
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct GenesisAllocation {
    pub address: String,
    pub value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [connections]
            magic = 7
            relay_timeout_seconds = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.connections.magic, 7);
        assert_eq!(config.connections.relay_timeout, Duration::from_secs(10));
        assert_eq!(
            config.connections.server_addr,
            defaults::connections_server_addr()
        );
        assert_eq!(config.mempool, Mempool::default());
    }

    #[test]
    fn full_sample_parses() {
        let config: Config = toml::from_str(
            r#"
            [connections]
            server_addr = "127.0.0.1:31337"
            known_peers = ["127.0.0.1:31338"]
            handshake_timeout_seconds = 2

            [jsonrpc]
            enabled = false

            [mempool]
            size_for_fee = 1000
            fee_exponent = 2.5

            [[genesis.allocations]]
            address = "0000000000000000000000000000000000000000"
            value = 1000000000
            "#,
        )
        .unwrap();

        assert!(!config.jsonrpc.enabled);
        assert_eq!(config.connections.known_peers.len(), 1);
        assert_eq!(config.mempool.size_for_fee, 1_000);
        assert_eq!(config.genesis.allocations.len(), 1);
        assert_eq!(config.genesis.allocations[0].value, 1_000_000_000);
    }
}
