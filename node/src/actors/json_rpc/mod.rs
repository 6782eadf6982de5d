mod connection;
/// JSON-RPC methods
pub mod json_rpc_methods;
mod newline_codec;
mod server;

pub use self::server::JsonRpcServer;
