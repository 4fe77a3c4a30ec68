//! Accept-key derivation for the upgrade handshake.
//!
//! DESIGN
//! ======
//! `derive_accept_key` hashes the client's `Sec-WebSocket-Key` concatenated
//! with a private server secret, not the RFC 6455 magic GUID. This is
//! deliberate: peers must know the secret out-of-band, which makes the relay
//! a private protocol rather than a browser-interoperable endpoint. The HTTP
//! plumbing that carries the result lives in the caller, not here.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};

/// Derive the accept key: `base64(SHA1(client_key ‖ secret))`.
#[must_use]
pub fn derive_accept_key(client_key: &str, secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(secret.as_bytes());
    STANDARD.encode(hasher.finalize())
}
