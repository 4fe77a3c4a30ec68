//! Connection lifecycle and per-connection pumps.
//!
//! DESIGN
//! ======
//! Each peer gets two tasks over its split stream: a receive pump that
//! parses frames and classifies them (close handshake, ping/pong, data →
//! reassembly → broadcast), and a write pump that drains the connection's
//! bounded outbound channel onto the wire. Exactly one task reads and one
//! writes; nothing else touches the stream.
//!
//! LIFECYCLE
//! =========
//! `Open → Closing → Closed`, no way back. `Closing` is entered the instant
//! a Close frame is seen, an error occurs, or `close()` is called; the
//! registry entry is removed *before* the stream is released so the registry
//! never observes a dead peer as live. `Closed` is set by a supervisor task
//! only after both pumps have terminated. `close()` is idempotent and
//! unblocks both pumps through a shared `CancellationToken`.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::WsError;
use crate::frame::{CLOSE_NORMAL, Frame, Opcode};
use crate::reassembly::ReassemblyBuffer;
use crate::registry::{ConnectionId, Registry};

// =============================================================================
// LIFECYCLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Open,
    Closing,
    Closed,
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Handle to one peer's connection. Cloneable; all clones share the same
/// underlying lifecycle, outbound channel, and cancellation token.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Shared>,
}

struct Shared {
    id: ConnectionId,
    client_key: String,
    registry: Registry,
    outbound: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
    lifecycle: watch::Sender<Lifecycle>,
}

impl Connection {
    /// Take ownership of an upgraded stream, register the peer, and start
    /// both pumps. The returned handle does not own the pumps; dropping it
    /// leaves the connection running until the peer closes or errors.
    pub fn spawn<S>(stream: S, client_key: impl Into<String>, registry: Registry, outbound_capacity: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (outbound, outbound_rx) = mpsc::channel(outbound_capacity);
        let cancel = CancellationToken::new();
        let (lifecycle, _) = watch::channel(Lifecycle::Open);

        let conn = Self {
            inner: Arc::new(Shared {
                id: Uuid::new_v4(),
                client_key: client_key.into(),
                registry: registry.clone(),
                outbound: outbound.clone(),
                cancel: cancel.clone(),
                lifecycle,
            }),
        };

        registry.insert(conn.id(), outbound, cancel);
        info!(id = %conn.id(), "connection open");

        let recv = tokio::spawn(recv_pump(reader, conn.clone()));
        let send = tokio::spawn(write_pump(writer, outbound_rx, conn.clone()));

        // Supervisor: the connection is Closed only once both pumps have
        // observed shutdown and terminated.
        let supervisor = conn.clone();
        tokio::spawn(async move {
            let _ = recv.await;
            let _ = send.await;
            supervisor.finish();
        });

        conn
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// Opaque handshake key this peer presented at upgrade time. Kept for
    /// key derivation only; never used as peer identity.
    #[must_use]
    pub fn client_key(&self) -> &str {
        &self.inner.client_key
    }

    #[must_use]
    pub fn state(&self) -> Lifecycle {
        *self.inner.lifecycle.borrow()
    }

    /// Queue an outbound text message, framed as one final Text frame.
    /// This is the local-input path; peer-to-peer broadcast does not use it.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` when the connection is no longer open.
    pub async fn send_text(&self, text: &str) -> Result<(), WsError> {
        if self.state() != Lifecycle::Open {
            return Err(WsError::ConnectionClosed);
        }
        let bytes = Frame::data(Opcode::Text, text.as_bytes().to_vec()).to_bytes();
        self.inner
            .outbound
            .send(bytes)
            .await
            .map_err(|_| WsError::ConnectionClosed)
    }

    /// Begin teardown: remove the peer from the registry, then cancel both
    /// pumps (which releases the stream). Safe to call from anywhere, any
    /// number of times.
    pub fn close(&self) {
        if !self.begin_close() {
            return;
        }
        self.inner.registry.remove(self.inner.id);
        self.inner.cancel.cancel();
    }

    /// Wait until both pumps have terminated and the state is `Closed`.
    pub async fn closed(&self) {
        let mut rx = self.inner.lifecycle.subscribe();
        while *rx.borrow_and_update() != Lifecycle::Closed {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// `Open → Closing`, exactly once. Returns whether this call made the
    /// transition.
    fn begin_close(&self) -> bool {
        let mut entered = false;
        self.inner.lifecycle.send_if_modified(|state| {
            if *state == Lifecycle::Open {
                *state = Lifecycle::Closing;
                entered = true;
                true
            } else {
                false
            }
        });
        entered
    }

    /// Mark the connection fully closed. Called by the supervisor after both
    /// pumps join; also covers pumps that stopped without an explicit
    /// `close()` (registry eviction cancels the token directly).
    fn finish(&self) {
        self.close();
        self.inner.lifecycle.send_replace(Lifecycle::Closed);
        info!(id = %self.inner.id, "connection closed");
    }

    /// Best-effort Close frame. Queued, not awaited: if the outbound channel
    /// is full the peer was not draining anyway and teardown proceeds.
    fn queue_close(&self, status: u16) {
        let bytes = Frame::close(status).to_bytes();
        if self.inner.outbound.try_send(bytes).is_err() {
            debug!(id = %self.inner.id, status, "close frame dropped: outbound channel unavailable");
        }
    }

    fn queue_frame(&self, frame: &Frame) {
        if self.inner.outbound.try_send(frame.to_bytes()).is_err() {
            debug!(id = %self.inner.id, "outbound frame dropped: channel unavailable");
        }
    }
}

// =============================================================================
// RECEIVE PUMP
// =============================================================================

/// Parse frames in arrival order until close, error, or cancellation.
async fn recv_pump<R: AsyncRead + Unpin>(mut reader: R, conn: Connection) {
    let mut pending = ReassemblyBuffer::new();

    loop {
        let frame = tokio::select! {
            () = conn.inner.cancel.cancelled() => break,
            result = Frame::read(&mut reader) => match result {
                Ok(frame) => frame,
                Err(err) => {
                    fail(&conn, &err, "recv: frame parse failed");
                    break;
                }
            },
        };

        match frame.opcode {
            Opcode::Close => {
                let status = frame.close_status().unwrap_or(CLOSE_NORMAL);
                info!(id = %conn.id(), status, "recv: close handshake");
                conn.queue_close(status);
                conn.close();
                break;
            }
            Opcode::Ping => match frame.decode() {
                Ok(payload) => conn.queue_frame(&Frame::data(Opcode::Pong, payload)),
                Err(err) => {
                    fail(&conn, &err, "recv: malformed ping");
                    break;
                }
            },
            Opcode::Pong => {}
            _ => match pending.push(frame) {
                Ok(Some(message)) => {
                    let relayed = Frame::data(message.opcode, message.payload);
                    conn.inner.registry.broadcast(conn.id(), &relayed.to_bytes());
                }
                Ok(None) => {}
                Err(err) => {
                    fail(&conn, &err, "recv: reassembly failed");
                    break;
                }
            },
        }
    }
}

/// Shared failure path: best-effort Close where the protocol defines a
/// status, then teardown. Errors never propagate past the connection.
fn fail(conn: &Connection, err: &WsError, context: &'static str) {
    if let Some(status) = err.close_status() {
        conn.queue_close(status);
    }
    warn!(id = %conn.id(), error = %err, "{context}");
    conn.close();
}

// =============================================================================
// WRITE PUMP
// =============================================================================

/// Drain the outbound channel onto the wire. The only writer of the stream.
async fn write_pump<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::Receiver<Vec<u8>>, conn: Connection) {
    loop {
        tokio::select! {
            () = conn.inner.cancel.cancelled() => break,
            received = rx.recv() => {
                let Some(bytes) = received else { break };
                if let Err(err) = writer.write_all(&bytes).await {
                    warn!(id = %conn.id(), error = %err, "send: write failed");
                    conn.close();
                    return;
                }
            }
        }
    }

    // Frames queued before the shutdown signal (the close echo in
    // particular) still reach the wire.
    while let Ok(bytes) = rx.try_recv() {
        if writer.write_all(&bytes).await.is_err() {
            break;
        }
    }
    let _ = writer.shutdown().await;
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
