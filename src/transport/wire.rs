//! Stream transport for packets leaving the process.

use std::{
    io::{ErrorKind, Read, Write},
    sync::{Mutex, MutexGuard},
};

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use super::{Router, Transport};
use crate::{
    error::PacketError,
    packet::{Packet, codec::PacketCodec},
    topology::WorkerId,
};

const READ_CHUNK: usize = 8 * 1024;

/// [`Transport`] writing framed packets to a byte stream.
///
/// The worker key is ignored: the receiving process routes each packet by
/// its target node.
#[derive(Debug)]
pub struct WireTransport<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WireTransport<W> {
    /// Wrap `writer`.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn lock(&self) -> MutexGuard<'_, W> {
        match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Recover the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> Transport for WireTransport<W> {
    fn push(&self, _worker: WorkerId, packet: Packet) -> Result<(), PacketError> {
        let mut frame = BytesMut::new();
        PacketCodec::new().encode(packet, &mut frame)?;
        let mut writer = self.lock();
        writer.write_all(&frame)?;
        writer.flush()?;
        Ok(())
    }
}

/// Decode packets from `reader` until end of stream and deliver each one
/// through `router`.
///
/// Returns the number of packets forwarded.
///
/// # Errors
///
/// Returns [`PacketError::ShortBuffer`] when the stream ends inside a frame,
/// and propagates decoding, routing and I/O errors.
pub fn forward_incoming<R: Read>(mut reader: R, router: &Router) -> Result<usize, PacketError> {
    let mut codec = PacketCodec::new();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    let mut forwarded = 0;
    loop {
        while let Some(packet) = codec.decode(&mut buf)? {
            router.forward(packet)?;
            forwarded += 1;
        }
        let read = match reader.read(&mut chunk) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }
        buf.extend_from_slice(chunk.get(..read).unwrap_or_default());
    }
    if !buf.is_empty() {
        return Err(PacketError::ShortBuffer);
    }
    debug!(forwarded, "incoming stream closed");
    Ok(forwarded)
}
