/// ChainManager actor module
pub mod chain_manager;

/// Codec module
pub mod codec;

/// JSON RPC server
pub mod json_rpc;

/// Actor messages module
pub mod messages;

/// Module running system actor
pub mod node;

/// Session actor module
pub mod session;

/// Sessions manager actor module
pub mod sessions_manager;
