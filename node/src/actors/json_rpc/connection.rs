use std::{io, rc::Rc};

use actix::{
    io::FramedWrite, io::WriteHandler, Actor, ActorContext, ActorFutureExt, Addr, AsyncContext,
    Context, ContextFutureSpawner, Running, StreamHandler, WrapFuture,
};
use bytes::BytesMut;
use jsonrpc_core::IoHandler;

use super::{
    newline_codec::NewLineCodec,
    server::{JsonRpcServer, Unregister},
};

/// A single JSON-RPC connection
pub struct JsonRpc {
    /// Write part of the TCP stream, framed one message per line
    pub framed: FramedWrite<BytesMut, tokio::net::tcp::OwnedWriteHalf, NewLineCodec>,
    /// Reference to parent
    // Needed to send the `Unregister` message when the connection closes
    pub parent: Addr<JsonRpcServer>,
    /// IoHandler, shared with every other connection
    pub jsonrpc_io: Rc<IoHandler>,
}

impl Actor for JsonRpc {
    type Context = Context<Self>;

    /// Method to be executed when the actor is stopping
    fn stopping(&mut self, ctx: &mut Self::Context) -> Running {
        // Unregister connection from JsonRpcServer
        self.parent.do_send(Unregister {
            addr: ctx.address(),
        });

        Running::Stop
    }
}

impl WriteHandler<io::Error> for JsonRpc {}

/// Implement `StreamHandler` trait in order to use `Framed` with an actor
impl StreamHandler<Result<BytesMut, io::Error>> for JsonRpc {
    /// This is the main event loop for client requests
    fn handle(&mut self, result: Result<BytesMut, io::Error>, ctx: &mut Self::Context) {
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Error in JSON-RPC connection stream: {}", e);
                ctx.stop();
                return;
            }
        };

        let request = match std::str::from_utf8(&bytes) {
            // A valid utf8 string is forwarded to the JSON-RPC parser.
            // The parser deals with malformed requests by answering
            // with a ParseError (-32700).
            Ok(request) => request.to_string(),
            Err(e) => {
                // When the input is not a valid utf8 string, generate
                // a ParseError by parsing an empty string instead
                log::error!("Invalid UTF8 in JSON-RPC input");
                log::debug!("{:?}", e);
                String::new()
            }
        };
        log::debug!("Got JSON-RPC request: {}", request);

        // Handle the response asynchronously: methods talk to other
        // actors before producing their result
        self.jsonrpc_io
            .handle_request(&request)
            .into_actor(self)
            .map(|response, act, _ctx| {
                if let Some(response) = response {
                    act.framed.write(BytesMut::from(response.as_str()));
                }
            })
            .wait(ctx);
    }
}
