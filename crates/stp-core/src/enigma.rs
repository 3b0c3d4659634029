//! The AEAD engine ("Enigma"): one directional XChaCha20-Poly1305 stream,
//! keyed from a KEM-derived secret via HKDF-SHA-512 and nonced from a
//! per-direction base nonce plus the record's sequence number.

use chacha20poly1305::aead::Aead;
use chacha20poly1305::{KeyInit, XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use sha2::{Digest, Sha512};

use crate::error::{Result, StpError};

/// The 24-byte XChaCha20-Poly1305 nonce minus the 8-byte little-endian
/// counter suffix appended per record.
pub const BASE_NONCE_SIZE: usize = 16;
const NONCE_SIZE: usize = 24;

/// Domain-separation labels for HKDF-Expand. Reusing a shared secret for
/// both directions without these would let a transcript swap the two
/// streams; see DESIGN.md.
pub const INFO_CLIENT_TO_SERVER: &[u8] = b"client-to-server-cipher";
pub const INFO_SERVER_TO_CLIENT: &[u8] = b"server-to-client-cipher";

pub struct Enigma {
    aead: XChaCha20Poly1305,
    base_nonce: [u8; BASE_NONCE_SIZE],
}

impl Enigma {
    /// Derive a directional AEAD from a KEM shared secret, a 16-byte base
    /// nonce, and a domain-separation info string.
    ///
    /// The HKDF salt is literally SHA-512 of an empty input — a fixed
    /// constant, not a per-session random value. This must be preserved
    /// bytewise for interoperability; see DESIGN.md.
    pub fn new(secret: &[u8], base_nonce: &[u8], info: &[u8]) -> Result<Self> {
        if base_nonce.len() != BASE_NONCE_SIZE {
            return Err(StpError::InvalidNonceLength(base_nonce.len()));
        }
        let salt = Sha512::digest([]);
        let hk = Hkdf::<Sha512>::new(Some(&salt), secret);
        let mut okm = [0u8; 32];
        hk.expand(info, &mut okm)
            .map_err(|_| StpError::Kem("HKDF expand failed".into()))?;

        let aead = XChaCha20Poly1305::new((&okm).into());
        let mut base = [0u8; BASE_NONCE_SIZE];
        base.copy_from_slice(base_nonce);
        Ok(Self {
            aead,
            base_nonce: base,
        })
    }

    pub fn encrypt(&self, plaintext: &[u8], counter: u64) -> Result<Vec<u8>> {
        let nonce = self.nonce(counter);
        self.aead
            .encrypt(&nonce, plaintext)
            .map_err(|_| StpError::InvalidCiphertext)
    }

    pub fn decrypt(&self, ciphertext: &[u8], counter: u64) -> Result<Vec<u8>> {
        let nonce = self.nonce(counter);
        self.aead
            .decrypt(&nonce, ciphertext)
            .map_err(|_| StpError::InvalidCiphertext)
    }

    fn nonce(&self, counter: u64) -> XNonce {
        let mut bytes = [0u8; NONCE_SIZE];
        bytes[..BASE_NONCE_SIZE].copy_from_slice(&self.base_nonce);
        bytes[BASE_NONCE_SIZE..].copy_from_slice(&counter.to_le_bytes());
        XNonce::from(bytes)
    }
}
