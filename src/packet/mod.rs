//! Framed packets exchanged between nodes.
//!
//! A packet is a single owned buffer: a fixed [`HEADER_LEN`]-byte header
//! immediately followed by the payload. Senders write payload bytes into a
//! [`PacketBuf`], which reserves the header prefix up front so sealing the
//! packet never copies the payload. Once sealed, a [`Packet`] is moved into
//! exactly one worker queue and consumed by value when the receiver is done
//! with it.
//!
//! The header layout is shared with the stream codec in [`codec`]:
//!
//! | bytes  | field                       |
//! |--------|-----------------------------|
//! | 0..4   | target node (`u32`, BE)     |
//! | 4..8   | message id (`i32`, BE)      |
//! | 8..12  | payload size (`u32`, BE)    |

#![expect(clippy::big_endian_bytes, reason = "packet headers are big-endian")]

pub mod codec;
pub mod queue;

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::{error::PacketError, topology::NodeId};

/// Length of a packet header in bytes.
pub const HEADER_LEN: usize = 12;
/// Largest payload a single packet may carry.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024; // 16 MiB

/// Signed message identifier; negative values are control opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(i32);

impl MessageId {
    /// Halt the addressed node.
    pub const HALT: Self = Self(-1);
    /// Open the process-wide trace log.
    pub const START_LOG: Self = Self(-2);
    /// Close the process-wide trace log.
    pub const STOP_LOG: Self = Self(-3);

    /// Message identifier for user data.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::ReservedMessageId`] when `id` does not fit the
    /// non-negative half of the identifier space.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokenflow::packet::{MessageId, MessageKind};
    ///
    /// let id = MessageId::data(7).expect("valid id");
    /// assert_eq!(id.kind(), MessageKind::Data(7));
    /// ```
    pub fn data(id: u32) -> Result<Self, PacketError> {
        i32::try_from(id).map(Self).map_err(|_| PacketError::ReservedMessageId(id))
    }

    /// Wrap a raw identifier as read from a header.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self { Self(raw) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn as_i32(self) -> i32 { self.0 }

    /// Classify the identifier.
    #[must_use]
    pub const fn kind(self) -> MessageKind {
        match self {
            Self::HALT => MessageKind::Control(ControlCommand::Halt),
            Self::START_LOG => MessageKind::Control(ControlCommand::StartLog),
            Self::STOP_LOG => MessageKind::Control(ControlCommand::StopLog),
            Self(raw) if raw >= 0 => MessageKind::Data(raw.unsigned_abs()),
            Self(raw) => MessageKind::Unknown(raw),
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Control actions carried by reserved message identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Set the halt flag of the target node.
    Halt,
    /// Open the trace log.
    StartLog,
    /// Close the trace log.
    StopLog,
}

/// Classification of a [`MessageId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// User data dispatched to the receive callback.
    Data(u32),
    /// A recognised control opcode.
    Control(ControlCommand),
    /// A negative identifier with no assigned meaning.
    Unknown(i32),
}

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Node the packet is addressed to.
    pub target: NodeId,
    /// Message identifier.
    pub message: MessageId,
    /// Payload size in bytes.
    pub size: u32,
}

impl PacketHeader {
    /// Parse a header from its fixed-size encoding.
    #[must_use]
    pub const fn from_bytes(buf: &[u8; HEADER_LEN]) -> Self {
        Self {
            target: NodeId::new(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])),
            message: MessageId(i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]])),
            size: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        }
    }

    /// Encode the header.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let [t0, t1, t2, t3] = self.target.as_u32().to_be_bytes();
        let [m0, m1, m2, m3] = self.message.0.to_be_bytes();
        let [s0, s1, s2, s3] = self.size.to_be_bytes();
        [t0, t1, t2, t3, m0, m1, m2, m3, s0, s1, s2, s3]
    }

    /// Parse the header at the start of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::ShortBuffer`] if fewer than [`HEADER_LEN`]
    /// bytes are available.
    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        let prefix: &[u8; HEADER_LEN] = buf
            .get(..HEADER_LEN)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(PacketError::ShortBuffer)?;
        Ok(Self::from_bytes(prefix))
    }
}

/// Growable packet under construction, with the header prefix reserved.
#[derive(Debug, Clone)]
pub struct PacketBuf {
    buf: BytesMut,
}

impl PacketBuf {
    /// Create an empty packet buffer.
    #[must_use]
    pub fn new() -> Self { Self::with_capacity(0) }

    /// Create a buffer with room for `payload` bytes without reallocating.
    #[must_use]
    pub fn with_capacity(payload: usize) -> Self {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + payload);
        buf.resize(HEADER_LEN, 0);
        Self { buf }
    }

    /// Create a buffer holding a copy of `payload`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokenflow::packet::PacketBuf;
    ///
    /// let buf = PacketBuf::from_payload(b"x");
    /// assert_eq!(buf.payload(), b"x");
    /// ```
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut buf = Self::with_capacity(payload.len());
        buf.extend_from_slice(payload);
        buf
    }

    /// Append payload bytes.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }

    /// Payload written so far.
    #[must_use]
    pub fn payload(&self) -> &[u8] { self.buf.get(HEADER_LEN..).unwrap_or_default() }

    /// Number of payload bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize { self.buf.len().saturating_sub(HEADER_LEN) }

    /// Returns `true` when no payload has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Fill in the header and freeze the buffer into a [`Packet`].
    pub(crate) fn seal(mut self, target: NodeId, message: MessageId) -> Result<Packet, PacketError> {
        let len = self.len();
        if len > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge(len));
        }
        let size = u32::try_from(len).map_err(|_| PacketError::PayloadTooLarge(len))?;
        let header = PacketHeader {
            target,
            message,
            size,
        };
        if let Some(prefix) = self.buf.get_mut(..HEADER_LEN) {
            prefix.copy_from_slice(&header.to_bytes());
        }
        Ok(Packet {
            header,
            frame: self.buf.freeze(),
        })
    }
}

impl Default for PacketBuf {
    fn default() -> Self { Self::new() }
}

/// A sealed packet: header plus payload in one allocation.
///
/// Packets are deliberately not `Clone`; each one is delivered and consumed
/// exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct Packet {
    header: PacketHeader,
    frame: Bytes,
}

impl Packet {
    /// Decoded header.
    #[must_use]
    pub const fn header(&self) -> &PacketHeader { &self.header }

    /// Target node.
    #[must_use]
    pub const fn target(&self) -> NodeId { self.header.target }

    /// Message identifier.
    #[must_use]
    pub const fn message(&self) -> MessageId { self.header.message }

    /// Payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { self.frame.get(HEADER_LEN..).unwrap_or_default() }

    /// Full encoded frame, header included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] { &self.frame }

    /// Reconstruct a packet from a complete encoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::ShortBuffer`] when the header is truncated,
    /// [`PacketError::PayloadTooLarge`] when the declared size exceeds
    /// [`MAX_PAYLOAD_SIZE`], and [`PacketError::SizeMismatch`] when the
    /// declared size disagrees with the bytes present.
    pub fn from_frame(frame: Bytes) -> Result<Self, PacketError> {
        let header = PacketHeader::parse(&frame)?;
        let size = header.size as usize;
        if size > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge(size));
        }
        if frame.len() != HEADER_LEN + size {
            return Err(PacketError::SizeMismatch);
        }
        Ok(Self { header, frame })
    }

    /// Consume the packet, returning the encoded frame.
    #[must_use]
    pub fn into_frame(self) -> Bytes { self.frame }
}
