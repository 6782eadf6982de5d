use std::{collections::HashSet, net::SocketAddr, rc::Rc, sync::Arc};

use actix::prelude::*;
use jsonrpc_core::IoHandler;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::FramedRead;

use basalt_config::config::Config;

use super::{
    connection::JsonRpc, json_rpc_methods::jsonrpc_io_handler, newline_codec::NewLineCodec,
};
use crate::actors::messages::InboundTcpConnect;

/// JSON RPC server
#[derive(Default)]
pub struct JsonRpcServer {
    /// Whether the interface is enabled at all
    enabled: bool,
    /// Server address
    server_addr: Option<SocketAddr>,
    /// Open connections, stored as instances of the `JsonRpc` actor
    open_connections: HashSet<Addr<JsonRpc>>,
    /// JSON-RPC methods
    // Stored as an `Rc` to avoid creating a new handler for each connection
    jsonrpc_io: Option<Rc<IoHandler>>,
}

/// Required trait for being able to retrieve JsonRpcServer address from registry
impl Supervised for JsonRpcServer {}

/// Required trait for being able to retrieve JsonRpcServer address from registry
impl SystemService for JsonRpcServer {}

impl JsonRpcServer {
    /// Build a JsonRpcServer from the node configuration
    pub fn from_config(config: &Arc<Config>) -> Self {
        JsonRpcServer {
            enabled: config.jsonrpc.enabled,
            server_addr: Some(config.jsonrpc.server_address),
            ..JsonRpcServer::default()
        }
    }

    /// Bind the server socket and feed inbound connections into this
    /// actor as `InboundTcpConnect` messages
    fn start_server(&mut self, ctx: &mut <Self as Actor>::Context) {
        let server_addr = match self.server_addr {
            Some(server_addr) => server_addr,
            None => {
                log::error!("JSON-RPC server address is not configured");
                return;
            }
        };
        self.jsonrpc_io = Some(Rc::new(jsonrpc_io_handler()));

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
                    log::info!("JSON-RPC interface is now running at {}", server_addr);
                }
                Err(e) => {
                    log::error!("Could not start JSON-RPC server at {}: {}", server_addr, e);
                }
            })
            .wait(ctx);
    }

    fn add_connection(&mut self, parent: Addr<JsonRpcServer>, stream: TcpStream) {
        log::debug!(
            "Add JSON-RPC connection (currently {} open connections)",
            1 + self.open_connections.len()
        );

        // Get a reference to the JSON-RPC method handler
        let jsonrpc_io = match self.jsonrpc_io.as_ref() {
            Some(jsonrpc_io) => Rc::clone(jsonrpc_io),
            None => return,
        };

        // Create a new `JsonRpc` actor which will listen to this stream
        let addr = JsonRpc::create(|ctx| {
            let (r, w) = stream.into_split();
            JsonRpc::add_stream(FramedRead::new(r, NewLineCodec), ctx);
            JsonRpc {
                framed: actix::io::FramedWrite::new(w, NewLineCodec, ctx),
                parent,
                jsonrpc_io,
            }
        });

        // Store the actor address
        self.open_connections.insert(addr);
    }

    fn remove_connection(&mut self, addr: &Addr<JsonRpc>) {
        self.open_connections.remove(addr);
        log::debug!(
            "Remove JSON-RPC connection (currently {} open connections)",
            self.open_connections.len()
        );
    }
}

impl Actor for JsonRpcServer {
    type Context = Context<Self>;

    /// Method to be executed when the actor is started
    fn started(&mut self, ctx: &mut Self::Context) {
        if !self.enabled {
            log::debug!("JSON-RPC interface explicitly disabled by configuration");
            ctx.stop();
            return;
        }
        log::debug!("Starting JSON-RPC interface");

        self.start_server(ctx);
    }
}

/// Handler for InboundTcpConnect messages (built from inbound connections)
impl Handler<InboundTcpConnect> for JsonRpcServer {
    /// Response for message, which is defined by `ResponseType` trait
    type Result = ();

    /// Method to handle the InboundTcpConnect message
    fn handle(&mut self, msg: InboundTcpConnect, ctx: &mut Self::Context) {
        self.add_connection(ctx.address(), msg.stream);
    }
}

/// Unregister a closed connection from the list of open connections
pub struct Unregister {
    /// Address of the connection actor that is going away
    pub addr: Addr<JsonRpc>,
}

impl Message for Unregister {
    type Result = ();
}

impl Handler<Unregister> for JsonRpcServer {
    type Result = ();

    /// Method to remove a finished connection
    fn handle(&mut self, msg: Unregister, _ctx: &mut Context<Self>) -> Self::Result {
        self.remove_connection(&msg.addr);
    }
}
