//! `TlsSession` keeps the concrete DTLS/TLS stack external (spec.md §1,
//! §9 "opaque handle → trait object"). Grounded on the trait-object
//! pattern `rtc-shared::crypto` uses to let the workspace depend on an
//! abstract crypto/transport surface instead of one library.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    InProgress,
    Complete,
}

/// A single DTLS association, implemented by an embedder-supplied
/// adapter over their DTLS stack of choice.
pub trait TlsSession: fmt::Debug {
    fn role(&self) -> Role;

    /// Feeds an inbound DTLS record; returns outbound flight bytes (if
    /// any) produced in response.
    fn handle_read(&mut self, data: &[u8]) -> shared::Result<Vec<u8>>;

    /// Drains handshake/application flight bytes queued for transmit.
    fn poll_transmit(&mut self) -> Option<Vec<u8>>;

    fn status(&self) -> HandshakeStatus;

    /// Exports `length` bytes of keying material under `label`, per
    /// RFC 5705, for SRTP key derivation (RFC 5764).
    fn export_keying_material(&self, label: &str, length: usize) -> shared::Result<Vec<u8>>;

    /// DER-encoded peer certificate, available once the handshake
    /// completes far enough to have received it.
    fn peer_certificate(&self) -> Option<Vec<u8>>;

    fn encrypt_application_data(&mut self, plaintext: &[u8]) -> shared::Result<Vec<u8>>;
    fn decrypt_application_data(&mut self, ciphertext: &[u8]) -> shared::Result<Vec<u8>>;
}
