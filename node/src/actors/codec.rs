use std::io::{self, Cursor};

use byteorder::{BigEndian, ReadBytesExt};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use basalt_data_structures::chain::BLOCK_SIZE_LIMIT;

const HEADER_SIZE: usize = 4; // bytes

/// Maximum frame payload accepted from a peer. A serialized block is
/// the largest legal message; anything bigger is cut off before the
/// whole frame is buffered.
pub const MAX_FRAME_SIZE: usize = BLOCK_SIZE_LIMIT as usize + 1024;

/// Codec for peer-to-peer transport
///
/// Format:
/// ```norun
/// Message size: u32, big endian
/// Message: [u8; Message size]
/// ```
///
/// The message is the bincode serialization of a
/// [`Message`](basalt_data_structures::types::Message).
#[derive(Debug, Default, Eq, PartialEq, Clone)]
pub struct P2PCodec;

/// Implement decoder trait for P2P codec
impl Decoder for P2PCodec {
    type Item = BytesMut;
    type Error = io::Error;

    /// Method to decode bytes to a request
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            // If the header is incomplete, return without consuming
            // anything. This method will be called again when more
            // bytes arrive.
            return Ok(None);
        }

        let msg_size = Cursor::new(&src[0..HEADER_SIZE])
            .read_u32::<BigEndian>()
            .unwrap() as usize;
        // Reject the frame from its header, before buffering the body
        if msg_size > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "frame of {} bytes exceeds the limit of {} bytes",
                    msg_size, MAX_FRAME_SIZE
                ),
            ));
        }
        if src.len() < msg_size + HEADER_SIZE {
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        Ok(Some(src.split_to(msg_size)))
    }
}

/// Implement encoder trait for P2P codec
impl Encoder<BytesMut> for P2PCodec {
    type Error = io::Error;

    /// Method to encode a response into bytes
    fn encode(&mut self, bytes: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("message of {} bytes is too big for a frame", bytes.len()),
            ));
        }
        dst.reserve(HEADER_SIZE + bytes.len());
        dst.put_u32(bytes.len() as u32);
        dst.extend_from_slice(&bytes);

        Ok(())
    }
}
