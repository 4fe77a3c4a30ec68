//! Connection registry — the one resource shared across connection tasks.
//!
//! DESIGN
//! ======
//! A single mutex guards the peer map; inserts, removals, and broadcast
//! snapshots are mutually exclusive. Broadcast copies the membership under
//! the lock and releases it before delivering, so a slow peer never stalls
//! other peers or blocks removal. Delivery goes through each peer's bounded
//! outbound channel; a failed delivery (closed or full) closes that peer
//! only — the sender and the remaining peers are unaffected.
//!
//! Membership is keyed on an opaque per-connection UUID assigned at attach
//! time, never on structural comparison of connection state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

/// Opaque, stable identity of one connection.
pub type ConnectionId = Uuid;

/// Non-owning handle to one live peer: where to queue outbound bytes and
/// how to shut the peer down when delivery fails.
#[derive(Clone)]
struct Peer {
    outbound: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
}

/// Process-wide set of live connections.
#[derive(Clone, Default)]
pub struct Registry {
    peers: Arc<Mutex<HashMap<ConnectionId, Peer>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, id: ConnectionId, outbound: mpsc::Sender<Vec<u8>>, cancel: CancellationToken) {
        self.lock().insert(id, Peer { outbound, cancel });
    }

    /// Remove a peer. Idempotent; returns whether the peer was present.
    pub(crate) fn remove(&self, id: ConnectionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Queue serialized frame bytes to every live peer except the sender.
    ///
    /// A peer whose channel rejects the frame (disconnected, or full because
    /// its write pump stopped draining) is removed and cancelled; the
    /// broadcast continues to the remaining peers.
    pub fn broadcast(&self, sender: ConnectionId, bytes: &[u8]) {
        let snapshot: Vec<(ConnectionId, Peer)> = {
            self.lock()
                .iter()
                .filter(|(id, _)| **id != sender)
                .map(|(id, peer)| (*id, peer.clone()))
                .collect()
        };

        for (id, peer) in snapshot {
            if let Err(err) = peer.outbound.try_send(bytes.to_vec()) {
                warn!(peer = %id, error = %err, "broadcast: delivery failed, closing peer");
                self.remove(id);
                peer.cancel.cancel();
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, Peer>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
