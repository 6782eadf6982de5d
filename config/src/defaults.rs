//! Default values for every configuration param. A configuration file
//! only needs to name the params it wants to override.

use std::{net::SocketAddr, time::Duration};

/// Network magic number, rejects cross-network chatter
pub fn connections_magic() -> u16 {
    0xb5a1
}

/// Socket address the P2P server binds to
pub fn connections_server_addr() -> SocketAddr {
    "0.0.0.0:21337".parse().unwrap()
}

/// Maximum number of concurrent inbound connections
pub fn connections_inbound_limit() -> u16 {
    128
}

/// Maximum number of outbound connections this node maintains
pub fn connections_outbound_limit() -> u16 {
    8
}

/// Time an unconsolidated session may take to finish the handshake
pub fn connections_handshake_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Time a consolidated session may stay silent before it is dropped.
/// Bounds how long a slow or hostile peer can hold a connection while
/// feeding a frame byte by byte.
pub fn connections_relay_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Whether the JSON-RPC server is enabled
pub fn jsonrpc_enabled() -> bool {
    true
}

/// Socket address of the JSON-RPC server
pub fn jsonrpc_server_address() -> SocketAddr {
    "127.0.0.1:21338".parse().unwrap()
}

/// Pool byte occupancy below which transaction sets are admitted for free
pub fn mempool_size_for_fee() -> u64 {
    500_000
}

/// Soft target for the pool byte occupancy
pub fn mempool_size_target() -> u64 {
    3_000_000
}

/// Exponent of the admission fee curve
pub fn mempool_fee_exponent() -> f64 {
    3.0
}

/// Fee rate charged at the occupancy target, in motes per byte
pub fn mempool_base_fee_per_byte() -> f64 {
    100.0
}

/// Maximum canonical size of a single standard transaction, in bytes
pub fn mempool_max_transaction_size() -> u64 {
    32_000
}

/// Maximum canonical size of a standard transaction set, in bytes
pub fn mempool_max_set_size() -> u64 {
    250_000
}

/// Epochs an unconfirmed transaction may linger before being purged
pub fn mempool_transaction_max_age() -> u32 {
    144
}
