//! Error taxonomy for the relay.
//!
//! DESIGN
//! ======
//! Two families, one enum. Transport errors (`IncompleteRead`) mean the
//! stream died mid-frame and the connection is torn down silently. Protocol
//! violations mean the peer sent bytes the protocol forbids; where RFC 6455
//! defines a close status for the violation, `close_status` returns it and
//! the receive pump attempts a best-effort Close frame before teardown.
//!
//! All errors are local to one connection. Nothing here crosses a
//! connection boundary.

use std::io;

use crate::frame::{CLOSE_PROTOCOL_ERROR, CLOSE_TOO_LARGE};

#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// The stream ended or failed before a full frame was read.
    #[error("incomplete read: {0}")]
    IncompleteRead(#[from] io::Error),
    /// A client-to-server frame arrived without the mandatory mask bit.
    #[error("received frame isn't masked")]
    UnmaskedFrame,
    /// The opcode nibble does not name a known frame type.
    #[error("unknown opcode {0:#x}")]
    UnknownOpcode(u8),
    /// A bare continuation frame cannot be decoded standalone; it must be
    /// FIN-stamped and opcode-stamped by reassembly first.
    #[error("can't decode continuation frame")]
    CannotDecodeContinuation,
    /// The declared payload length does not fit in addressable memory.
    #[error("payload length {0} exceeds addressable memory")]
    PayloadTooLarge(u64),
    /// The connection was already closed when an outbound send was attempted.
    #[error("connection is closed")]
    ConnectionClosed,
}

impl WsError {
    /// Close status to attempt before teardown, if the protocol defines one
    /// for this failure. `None` means close silently.
    #[must_use]
    pub fn close_status(&self) -> Option<u16> {
        match self {
            Self::UnmaskedFrame | Self::UnknownOpcode(_) | Self::CannotDecodeContinuation => {
                Some(CLOSE_PROTOCOL_ERROR)
            }
            Self::PayloadTooLarge(_) => Some(CLOSE_TOO_LARGE),
            Self::IncompleteRead(_) | Self::ConnectionClosed => None,
        }
    }
}
