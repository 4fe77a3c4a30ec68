//! Fragmentation reassembly — continuation frames into one logical message.
//!
//! DESIGN
//! ======
//! A per-connection ordered queue of frames awaiting a FIN. The buffer is
//! `Idle` when empty and `Accumulating` while the last pushed frame had
//! FIN=0. On a FIN frame the whole run drains front-to-back: continuation
//! frames carry opcode 0x0 and inherit the first frame's opcode, so each
//! buffered frame is FIN-stamped and opcode-stamped before decoding, and the
//! decoded payloads concatenate in arrival order. A decode failure mid-drain
//! aborts the whole message and leaves the buffer empty — partial corrupt
//! messages are never delivered.

use std::collections::VecDeque;

use crate::error::WsError;
use crate::frame::{Frame, Opcode};

/// One logical application message, reconstructed from a FIN-terminated run
/// of frames. Exists only between reassembly completion and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Opcode of the first frame of the run.
    pub opcode: Opcode,
    /// Concatenated decoded payloads, in arrival order.
    pub payload: Vec<u8>,
}

/// Ordered queue of received frames awaiting a terminal (FIN) frame.
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    pending: VecDeque<Frame>,
}

impl ReassemblyBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self { pending: VecDeque::new() }
    }

    /// No frames buffered; the next data frame starts a new message.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Append a data frame. Returns the completed message when this frame
    /// carried FIN, `None` while more continuations are expected.
    ///
    /// # Errors
    ///
    /// `CannotDecodeContinuation` when a run has no opcode to inherit (it
    /// began with a continuation frame) or a buffered frame fails to decode.
    /// The buffer is empty afterwards; the error is fatal to the connection.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>, WsError> {
        let fin = frame.fin;
        self.pending.push_back(frame);
        if !fin {
            return Ok(None);
        }

        // Opcode of the message is the opcode of the first frame of the run.
        let opcode = self.pending.front().map_or(Opcode::Continuation, |f| f.opcode);

        let mut payload = Vec::new();
        let frames: Vec<Frame> = self.pending.drain(..).collect();
        for mut buffered in frames {
            buffered.fin = true;
            buffered.opcode = opcode;
            payload.extend(buffered.decode()?);
        }

        Ok(Some(Message { opcode, payload }))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "reassembly_test.rs"]
mod tests;
