//! Tokio codec framing packets on a byte stream.
//!
//! [`PacketCodec`] lets a cross-process transport carry packets over any
//! `AsyncRead`/`AsyncWrite` pair via [`tokio_util::codec::Framed`], and is
//! also driven synchronously by [`crate::transport::wire::WireTransport`]. The
//! stream encoding is exactly the in-memory frame, so encoding never touches
//! the payload.
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use tokenflow::packet::codec::PacketCodec;
//!
//! let mut frames = FramedRead::new(stream, PacketCodec::new());
//! while let Some(packet) = frames.next().await {
//!     router.forward(packet?)?;
//! }
//! ```

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{HEADER_LEN, MAX_PAYLOAD_SIZE, Packet, PacketHeader};
use crate::error::PacketError;

/// Stateless codec for [`Packet`] frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCodec;

impl PacketCodec {
    /// Create a codec.
    #[must_use]
    pub const fn new() -> Self { Self }
}

impl Decoder for PacketCodec {
    type Error = PacketError;
    type Item = Packet;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }
        let header = PacketHeader::parse(src)?;
        let size = header.size as usize;
        if size > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge(size));
        }
        let frame_len = HEADER_LEN + size;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }
        Packet::from_frame(src.split_to(frame_len).freeze()).map(Some)
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = PacketError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = item.into_frame();
        dst.reserve(frame.len());
        dst.put_slice(&frame);
        Ok(())
    }
}
