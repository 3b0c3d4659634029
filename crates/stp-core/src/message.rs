//! Wire types carried inside a [`SignedTransport`] envelope.
//!
//! These are the only structured values STP itself knows about; the
//! application payload exchanged after `READY` is opaque to the codec.

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

/// The outer envelope for every record on the wire, plaintext during
/// introduction and AEAD-sealed (whole) thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransport {
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
    pub metadata: Metadata,
    pub padding: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Metadata {
    pub sequence: u64,
    pub timestamp: i64,
}

/// Plaintext long-term public key exchange, the first thing each side sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Introduce {
    pub public: Vec<u8>,
    pub padding: Vec<u8>,
}

/// The KEM exchange record, carried inside a `SignedTransport` during the
/// handshake phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handshake {
    pub key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub session_id: Option<String>,
    pub padding: Vec<u8>,
}

/// 0..63 random bytes, present only to blunt traffic analysis of message
/// length; never inspected on receipt. Shared by every wire type above that
/// carries a `padding` field.
pub fn random_padding() -> Vec<u8> {
    let mut len_byte = [0u8; 1];
    OsRng.fill_bytes(&mut len_byte);
    let len = (len_byte[0] % 64) as usize;
    let mut padding = vec![0u8; len];
    OsRng.fill_bytes(&mut padding);
    padding
}
