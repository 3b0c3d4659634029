//! ML-KEM-768 key exchange (FIPS 203). This is the only key-exchange
//! mechanism STP supports; there is no negotiation.

use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{Ciphertext, EncodedSizeUser, KemCore, MlKem768};
use rand_core::OsRng;

use crate::error::{Result, StpError};

type EncapsulationKey = <MlKem768 as KemCore>::EncapsulationKey;
type DecapsulationKey = <MlKem768 as KemCore>::DecapsulationKey;

/// An ephemeral ML-KEM-768 keypair, generated once per handshake attempt.
pub struct MlKem {
    decapsulation_key: DecapsulationKey,
    encapsulation_key: EncapsulationKey,
}

impl MlKem {
    /// Generate a fresh keypair.
    pub fn new() -> Self {
        let (decapsulation_key, encapsulation_key) = MlKem768::generate(&mut OsRng);
        Self {
            decapsulation_key,
            encapsulation_key,
        }
    }

    /// The marshaled encapsulation (public) key, sent to the peer.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.encapsulation_key.as_bytes().to_vec()
    }

    /// Decapsulate a ciphertext received from the peer into the shared secret.
    pub fn decapsulate(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let ct = parse_ciphertext(ciphertext)?;
        let shared = self
            .decapsulation_key
            .decapsulate(&ct)
            .map_err(|_| StpError::Kem("decapsulation failed".into()))?;
        Ok(shared.to_vec())
    }
}

impl Default for MlKem {
    fn default() -> Self {
        Self::new()
    }
}

/// Encapsulate against a peer's marshaled encapsulation key, producing both
/// the shared secret and the ciphertext to send back.
pub fn encapsulate(peer_public_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let encoded = peer_public_key
        .try_into()
        .map_err(|_| StpError::InvalidKey)?;
    let ek = EncapsulationKey::from_bytes(&encoded);
    let (ct, shared) = ek
        .encapsulate(&mut OsRng)
        .map_err(|_| StpError::Kem("encapsulation failed".into()))?;
    Ok((shared.to_vec(), ct.to_vec()))
}

fn parse_ciphertext(bytes: &[u8]) -> Result<Ciphertext<MlKem768>> {
    bytes.try_into().map_err(|_| StpError::InvalidKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encapsulate_decapsulate_agree() {
        let responder_kem = MlKem::new();
        let (shared_enc, ciphertext) = encapsulate(&responder_kem.public_key_bytes()).unwrap();
        let shared_dec = responder_kem.decapsulate(&ciphertext).unwrap();
        assert_eq!(shared_enc, shared_dec);
    }

    #[test]
    fn malformed_public_key_is_rejected() {
        let err = encapsulate(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, StpError::InvalidKey));
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        let kem = MlKem::new();
        let err = kem.decapsulate(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, StpError::InvalidKey));
    }
}
