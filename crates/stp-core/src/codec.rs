//! Serialization, signing, and verification of the `SignedTransport`
//! envelope. This module never touches the AEAD layer; callers are
//! responsible for sealing/unsealing the bytes this produces/consumes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StpError};
use crate::identity::{Identity, RemotePublicKey};
use crate::message::{random_padding, Metadata, SignedTransport};

fn now_epoch_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Serialize `payload`, sign it with `identity`, and wrap it in a
/// `SignedTransport` at sequence `seq`. Returns the serialized envelope
/// (still plaintext — the caller seals it) and the metadata that was used.
pub fn serialize<T: Serialize>(
    payload: &T,
    identity: &Identity,
    seq: u64,
) -> Result<(Vec<u8>, Metadata)> {
    let data = bincode::serialize(payload)?;
    let signature = identity.sign(&data).to_bytes().to_vec();
    let metadata = Metadata {
        sequence: seq,
        timestamp: now_epoch_seconds(),
    };
    let envelope = SignedTransport {
        data,
        signature,
        metadata,
        padding: random_padding(),
    };
    let bytes = bincode::serialize(&envelope)?;
    Ok((bytes, metadata))
}

/// Deserialize a `SignedTransport` from `bytes`, enforce its sequence
/// number against `expected_seq`, verify its signature against
/// `remote_key`, then deserialize `data` into `T`.
pub fn deserialize<T: DeserializeOwned>(
    bytes: &[u8],
    expected_seq: u64,
    remote_key: &RemotePublicKey,
) -> Result<(T, Metadata)> {
    let envelope: SignedTransport = bincode::deserialize(bytes)?;
    if envelope.metadata.sequence != expected_seq {
        return Err(StpError::InvalidSeqNumber {
            expected: expected_seq,
            got: envelope.metadata.sequence,
        });
    }
    let sig_bytes: [u8; 64] = envelope
        .signature
        .as_slice()
        .try_into()
        .map_err(|_| StpError::InvalidSignature)?;
    let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    remote_key.verify(&envelope.data, &signature)?;
    let payload = bincode::deserialize(&envelope.data)?;
    Ok((payload, envelope.metadata))
}
