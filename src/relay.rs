//! Top-level relay handle.
//!
//! DESIGN
//! ======
//! `Relay` ties the configuration to one shared [`Registry`] and is the
//! seam between the out-of-scope HTTP layer and the core: the caller does
//! the Upgrade negotiation, asks for `accept_key` to finish its response
//! header, then hands the raw duplex stream to `attach`. Everything below
//! that point — framing, reassembly, broadcast, teardown — is autonomous.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::RelayConfig;
use crate::connection::Connection;
use crate::handshake;
use crate::registry::Registry;

#[derive(Clone)]
pub struct Relay {
    config: RelayConfig,
    registry: Registry,
}

impl Relay {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self { config, registry: Registry::new() }
    }

    /// Live-connection registry, shared by every attached connection.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Accept key for the caller's Upgrade response header.
    #[must_use]
    pub fn accept_key(&self, client_key: &str) -> String {
        handshake::derive_accept_key(client_key, &self.config.secret)
    }

    /// Take ownership of an upgraded stream and start relaying. The stream
    /// must already be past HTTP negotiation.
    pub fn attach<S>(&self, stream: S, client_key: impl Into<String>) -> Connection
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Connection::spawn(stream, client_key, self.registry.clone(), self.config.outbound_capacity)
    }
}
