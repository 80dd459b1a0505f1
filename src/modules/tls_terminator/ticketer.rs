//! Session tickets encrypted under a key shared by every proxy.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use sha2::{Digest, Sha256};
use tokio_rustls::rustls::server::ProducesTickets;

const NONCE_LEN: usize = 12;

/// Encrypts TLS session tickets with ChaCha20-Poly1305 under a key derived
/// from a configured secret.
///
/// Proxies configured with the same secret accept each other's tickets.
pub struct SharedSecretTicketer {
    cipher: ChaCha20Poly1305,
    lifetime: u32,
}

impl std::fmt::Debug for SharedSecretTicketer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretTicketer")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl SharedSecretTicketer {
    /// Derive the ticket key from `secret`. `lifetime` is in seconds.
    #[must_use]
    pub fn new(secret: &[u8], lifetime: u32) -> Self {
        let key = Sha256::digest(secret);
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
            lifetime,
        }
    }
}

impl ProducesTickets for SharedSecretTicketer {
    fn enabled(&self) -> bool {
        true
    }

    fn lifetime(&self) -> u32 {
        self.lifetime
    }

    fn encrypt(&self, plain: &[u8]) -> Option<Vec<u8>> {
        let nonce: [u8; NONCE_LEN] = rand::random();
        let sealed = self.cipher.encrypt(Nonce::from_slice(&nonce), plain).ok()?;

        let mut ticket = Vec::with_capacity(NONCE_LEN + sealed.len());
        ticket.extend_from_slice(&nonce);
        ticket.extend_from_slice(&sealed);
        Some(ticket)
    }

    fn decrypt(&self, ticket: &[u8]) -> Option<Vec<u8>> {
        if ticket.len() < NONCE_LEN {
            return None;
        }
        let (nonce, sealed) = ticket.split_at(NONCE_LEN);
        self.cipher.decrypt(Nonce::from_slice(nonce), sealed).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_secret_interoperates() {
        let a = SharedSecretTicketer::new(b"fleet secret", 3600);
        let b = SharedSecretTicketer::new(b"fleet secret", 3600);

        let ticket = a.encrypt(b"session state").unwrap();
        assert_eq!(b.decrypt(&ticket).unwrap(), b"session state");
    }

    #[test]
    fn test_other_secret_rejected() {
        let a = SharedSecretTicketer::new(b"fleet secret", 3600);
        let other = SharedSecretTicketer::new(b"another secret", 3600);

        let ticket = a.encrypt(b"session state").unwrap();
        assert!(other.decrypt(&ticket).is_none());
    }

    #[test]
    fn test_tampered_or_short_ticket_rejected() {
        let ticketer = SharedSecretTicketer::new(b"fleet secret", 3600);

        let mut ticket = ticketer.encrypt(b"session state").unwrap();
        let last = ticket.len() - 1;
        ticket[last] ^= 0x01;

        assert!(ticketer.decrypt(&ticket).is_none());
        assert!(ticketer.decrypt(&[0u8; 4]).is_none());
    }

    #[test]
    fn test_nonce_differs_per_ticket() {
        let ticketer = SharedSecretTicketer::new(b"fleet secret", 60);
        assert!(ticketer.enabled());
        assert_eq!(ticketer.lifetime(), 60);
        assert_ne!(
            ticketer.encrypt(b"same").unwrap(),
            ticketer.encrypt(b"same").unwrap()
        );
    }
}
