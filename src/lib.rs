//! wsrelay — a from-scratch WebSocket message relay over raw upgraded
//! streams.
//!
//! ARCHITECTURE
//! ============
//! Bytes arrive on a connection's stream → [`frame::Frame::read`] parses one
//! wire frame → the receive pump classifies it (control vs data) → data
//! frames feed the per-connection [`reassembly::ReassemblyBuffer`] → a
//! completed message is re-framed (FIN=1, unmasked) and fanned out through
//! the shared [`registry::Registry`] to every other live connection, whose
//! write pump serializes it back onto the wire.
//!
//! The HTTP server and Upgrade negotiation live in the caller: it performs
//! the handshake, uses [`Relay::accept_key`] for the response header, and
//! hands the raw duplex stream to [`Relay::attach`].
//!
//! Note the relay speaks a private variant of the protocol: the accept key
//! is derived from a server secret instead of the RFC 6455 magic GUID (see
//! [`handshake`]), though the frame layer itself is bit-compatible with
//! RFC 6455.

pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod reassembly;
pub mod registry;
pub mod relay;

pub use config::RelayConfig;
pub use connection::{Connection, Lifecycle};
pub use error::WsError;
pub use frame::{Frame, Opcode};
pub use reassembly::{Message, ReassemblyBuffer};
pub use registry::{ConnectionId, Registry};
pub use relay::Relay;
