//! Long-term signing identity: an Ed25519 keypair bound to this host.
//!
//! The private key never leaves the process after it is loaded; only the
//! public component is marshaled onto the wire, during introduction.

use std::fs;
use std::path::Path;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rand_core::OsRng;

use crate::error::{Result, StpError};

/// A long-term Ed25519 identity. Fixed to Ed25519 for this implementation —
/// the on-disk PEM format and the 64-byte wire signature size both assume it.
/// A second scheme (e.g. ML-DSA-65) could be added as a sibling enum without
/// touching the handshake or transport layers; see DESIGN.md.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a fresh keypair using the OS CSPRNG. Does not touch disk.
    pub fn create() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Write the private key as a PEM "PRIVATE KEY" (PKCS#8) block at `path`,
    /// with the file at 0600 and its parent directory at 0700.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
            set_dir_permissions(parent)?;
        }
        let pem = self
            .signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|_| StpError::InvalidKey)?;
        fs::write(path, pem.as_bytes())?;
        set_file_permissions(path)?;
        Ok(())
    }

    /// Load a previously-saved identity from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StpError::MissingFile);
        }
        let pem = fs::read_to_string(path)?;
        let signing_key =
            SigningKey::from_pkcs8_pem(&pem).map_err(|_| StpError::MissingPem)?;
        Ok(Self { signing_key })
    }

    /// Load the identity at `path`, or create and persist a new one if it
    /// doesn't exist yet. This is the only place STP performs I/O at
    /// process startup, and it is driven explicitly by the caller rather
    /// than a module-level initializer.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(id) => Ok(id),
            Err(StpError::MissingFile) => {
                let id = Self::create();
                id.save(path)?;
                tracing::info!(path = %path.display(), "generated new identity");
                Ok(id)
            }
            Err(e) => Err(e),
        }
    }

    pub fn public_key(&self) -> RemotePublicKey {
        RemotePublicKey {
            key: self.signing_key.verifying_key(),
        }
    }

    /// The marshaled form of our own public key, as sent during introduction.
    pub fn marshal_public_key(&self) -> Vec<u8> {
        self.public_key().marshal()
    }

    pub fn sign(&self, msg: &[u8]) -> Signature {
        self.signing_key.sign(msg)
    }
}

/// A peer's long-term public key, pinned for the lifetime of a session.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RemotePublicKey {
    key: VerifyingKey,
}

impl RemotePublicKey {
    /// Our marshaled form is simply the 32 raw Ed25519 public key bytes.
    pub fn marshal(&self) -> Vec<u8> {
        self.key.to_bytes().to_vec()
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| StpError::InvalidKey)?;
        let key = VerifyingKey::from_bytes(&arr).map_err(|_| StpError::InvalidKey)?;
        Ok(Self { key })
    }

    pub fn verify(&self, msg: &[u8], sig: &Signature) -> Result<()> {
        self.key
            .verify(msg, sig)
            .map_err(|_| StpError::InvalidSignature)
    }
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generate_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("id.key");

        let id = Identity::create();
        id.save(&path).unwrap();

        let loaded = Identity::load(&path).unwrap();
        assert_eq!(id.public_key(), loaded.public_key());
    }

    #[test]
    fn load_or_create_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("id.key");

        let first = Identity::load_or_create(&path).unwrap();
        let second = Identity::load_or_create(&path).unwrap();
        assert_eq!(first.public_key(), second.public_key());
    }

    #[test]
    fn load_missing_file_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("does-not-exist.key");
        match Identity::load(&path) {
            Err(StpError::MissingFile) => {}
            other => panic!("expected MissingFile, got {other:?}"),
        }
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let id = Identity::create();
        let msg = b"hello stp";
        let sig = id.sign(msg);
        id.public_key().verify(msg, &sig).unwrap();
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let id = Identity::create();
        let msg = b"hello stp";
        let mut sig_bytes = id.sign(msg).to_bytes();
        sig_bytes[0] ^= 0xff;
        let sig = Signature::from_bytes(&sig_bytes);
        assert!(id.public_key().verify(msg, &sig).is_err());
    }
}
