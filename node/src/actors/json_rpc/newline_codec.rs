use std::io;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Codec for JSON-RPC transport
///
/// One message per line: read until the first newline (`\n`), which is
/// stripped from the returned bytes.
#[derive(Debug, Default, Eq, PartialEq, Clone)]
pub struct NewLineCodec;

/// Implement decoder trait for NewLineCodec
impl Decoder for NewLineCodec {
    type Item = BytesMut;
    type Error = io::Error;

    /// Method to decode bytes to a request
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // If there is no newline yet, return without consuming
        // anything; this method is called again when more bytes arrive
        match src.iter().position(|byte| *byte == b'\n') {
            Some(newline_pos) => {
                let mut line = src.split_to(newline_pos + 1);
                line.truncate(newline_pos);

                Ok(Some(line))
            }
            None => Ok(None),
        }
    }
}

/// Implement encoder trait for NewLineCodec
impl Encoder<BytesMut> for NewLineCodec {
    type Error = io::Error;

    /// Method to encode a response into bytes. The input should not
    /// contain any newline characters.
    fn encode(&mut self, bytes: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(bytes.len() + 1);
        dst.put(bytes);
        dst.put_u8(b'\n');

        Ok(())
    }
}
