//! WebSocket wire frame — parsing, serialization, and unmasking.
//!
//! WIRE FORMAT
//! ===========
//! Byte 0: `FIN(1) RSV1(1) RSV2(1) RSV3(1) OPCODE(4)`.
//! Byte 1: `MASK(1) LEN7(7)`. LEN7 < 126 is the payload length; 126 means
//! the next 2 bytes (big-endian) are; 127 means the next 8 bytes are.
//! If MASK is set, 4 mask bytes follow, then the payload, XOR-masked with
//! `mask[i mod 4]`.
//!
//! DESIGN
//! ======
//! This module owns all binary-layout knowledge. `Frame::read` consumes an
//! `AsyncRead` one frame at a time; any short read is a transport error
//! (`IncompleteRead`), distinct from protocol violations. Client frames must
//! be masked (`UnmaskedFrame` otherwise); frames this server produces are
//! never masked, per the protocol's direction rules.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::WsError;

// =============================================================================
// CLOSE STATUS CODES
// =============================================================================

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Protocol error (unmasked client frame, malformed fragmentation).
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;

/// Message too big to process.
pub const CLOSE_TOO_LARGE: u16 = 1009;

// =============================================================================
// OPCODE
// =============================================================================

/// Frame type carried in the low nibble of byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    /// Parse the opcode nibble.
    ///
    /// # Errors
    ///
    /// Returns `UnknownOpcode` for reserved or undefined values.
    pub fn from_u8(raw: u8) -> Result<Self, WsError> {
        match raw {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            other => Err(WsError::UnknownOpcode(other)),
        }
    }

    /// Control frames are out-of-band; they never carry application messages.
    #[must_use]
    pub fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

// =============================================================================
// FRAME
// =============================================================================

/// One unit of the wire format. Transient: parsed, classified, and either
/// fed to reassembly or answered immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: Opcode,
    /// Present iff the frame arrived masked. Frames this server builds for
    /// sending leave it `None`.
    pub mask: Option<[u8; 4]>,
    /// Raw payload, still masked when `mask` is present.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build an unmasked final data frame, ready to serialize and send.
    #[must_use]
    pub fn data(opcode: Opcode, payload: Vec<u8>) -> Self {
        Self { fin: true, rsv1: false, rsv2: false, rsv3: false, opcode, mask: None, payload }
    }

    /// Build a Close frame carrying a big-endian status code.
    #[must_use]
    pub fn close(status: u16) -> Self {
        Self::data(Opcode::Close, status.to_be_bytes().to_vec())
    }

    /// Read exactly one frame from the stream.
    ///
    /// # Errors
    ///
    /// `IncompleteRead` on any short read; `UnmaskedFrame` when the mask bit
    /// is clear; `UnknownOpcode` for reserved opcodes; `PayloadTooLarge`
    /// when the declared length does not fit in `usize`.
    pub async fn read<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, WsError> {
        let mut header = [0u8; 2];
        reader.read_exact(&mut header).await?;

        let fin = header[0] & 0x80 != 0;
        let rsv1 = header[0] & 0x40 != 0;
        let rsv2 = header[0] & 0x20 != 0;
        let rsv3 = header[0] & 0x10 != 0;
        let opcode = Opcode::from_u8(header[0] & 0x0F)?;

        if header[1] & 0x80 == 0 {
            return Err(WsError::UnmaskedFrame);
        }

        let declared = read_payload_length(reader, header[1] & 0x7F).await?;
        let len = usize::try_from(declared).map_err(|_| WsError::PayloadTooLarge(declared))?;

        let mut mask = [0u8; 4];
        reader.read_exact(&mut mask).await?;

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await?;

        Ok(Self { fin, rsv1, rsv2, rsv3, opcode, mask: Some(mask), payload })
    }

    /// Unmask the payload of a final, non-continuation frame.
    ///
    /// # Errors
    ///
    /// `CannotDecodeContinuation` when the frame is not final or carries the
    /// continuation opcode — reassembly must stamp those first.
    pub fn decode(&self) -> Result<Vec<u8>, WsError> {
        if !self.fin || self.opcode == Opcode::Continuation {
            return Err(WsError::CannotDecodeContinuation);
        }
        match self.mask {
            Some(mask) => Ok(apply_mask(&self.payload, mask)),
            None => Ok(self.payload.clone()),
        }
    }

    /// Status code carried by a Close frame, if its payload holds one.
    #[must_use]
    pub fn close_status(&self) -> Option<u16> {
        let payload = self.decode().ok()?;
        let bytes: [u8; 2] = payload.get(..2)?.try_into().ok()?;
        Some(u16::from_be_bytes(bytes))
    }

    /// Serialize into wire bytes. The length-field branch mirrors `read`
    /// (same 126/127 thresholds). The payload is written as held: callers
    /// sending masked frames must pre-mask with [`apply_mask`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut first = self.opcode as u8;
        if self.fin {
            first |= 0x80;
        }
        if self.rsv1 {
            first |= 0x40;
        }
        if self.rsv2 {
            first |= 0x20;
        }
        if self.rsv3 {
            first |= 0x10;
        }

        let mut second: u8 = if self.mask.is_some() { 0x80 } else { 0 };
        let len = self.payload.len();

        let mut bytes = Vec::with_capacity(2 + 8 + 4 + len);
        if len < 126 {
            second |= len as u8;
            bytes.extend_from_slice(&[first, second]);
        } else if let Ok(len16) = u16::try_from(len) {
            second |= 126;
            bytes.extend_from_slice(&[first, second]);
            bytes.extend_from_slice(&len16.to_be_bytes());
        } else {
            second |= 127;
            bytes.extend_from_slice(&[first, second]);
            bytes.extend_from_slice(&(len as u64).to_be_bytes());
        }

        if let Some(mask) = self.mask {
            bytes.extend_from_slice(&mask);
        }
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

/// XOR each payload byte with `mask[i mod 4]`. Its own inverse.
#[must_use]
pub fn apply_mask(payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
    payload
        .iter()
        .enumerate()
        .map(|(i, byte)| byte ^ mask[i % 4])
        .collect()
}

/// Resolve the declared payload length from the 7-bit base field, reading
/// the 2- or 8-byte big-endian extension when the base demands one.
async fn read_payload_length<R: AsyncRead + Unpin>(reader: &mut R, base: u8) -> Result<u64, WsError> {
    match base {
        len @ 0..=125 => Ok(u64::from(len)),
        126 => {
            let mut ext = [0u8; 2];
            reader.read_exact(&mut ext).await?;
            Ok(u64::from(u16::from_be_bytes(ext)))
        }
        _ => {
            let mut ext = [0u8; 8];
            reader.read_exact(&mut ext).await?;
            Ok(u64::from_be_bytes(ext))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
