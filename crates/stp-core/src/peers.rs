//! The known-peers file: a newline-delimited set of base64-encoded,
//! previously-trusted public keys. This is the only persistent state TOFU
//! verification consults, and the only process-wide mutable state besides
//! the identity file itself.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::Result;
use crate::identity::RemotePublicKey;

/// Appends are serialized behind a mutex rather than relying on the
/// platform's O_APPEND atomicity, which the donor implementation assumed
/// but which isn't guaranteed across every target this crate might run on.
pub struct KnownPeers {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl KnownPeers {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            append_lock: Mutex::new(()),
        }
    }

    /// Set-membership check against the known-peers file. A missing file
    /// means no peer is known yet, not an error.
    pub fn is_known(&self, key: &RemotePublicKey) -> bool {
        let claim = BASE64.encode(key.marshal());
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return false;
        };
        contents.lines().any(|line| line == claim)
    }

    /// Append `key` to the known-peers file. Safe to call concurrently from
    /// multiple in-flight handshakes.
    pub fn trust(&self, key: &RemotePublicKey) -> Result<()> {
        let _guard = self.append_lock.lock().unwrap();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        set_file_permissions(&self.path)?;
        let line = BASE64.encode(key.marshal());
        writeln!(file, "{line}")?;
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use tempfile::TempDir;

    #[test]
    fn unknown_peer_is_not_known() {
        let dir = TempDir::new().unwrap();
        let peers = KnownPeers::new(dir.path().join("known"));
        let id = Identity::create();
        assert!(!peers.is_known(&id.public_key()));
    }

    #[test]
    fn trust_then_known_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("known");
        let id = Identity::create();

        let peers = KnownPeers::new(path.clone());
        peers.trust(&id.public_key()).unwrap();
        assert!(peers.is_known(&id.public_key()));

        // Re-open as if the process had restarted.
        let peers2 = KnownPeers::new(path);
        assert!(peers2.is_known(&id.public_key()));
    }

    #[test]
    fn duplicate_trust_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let peers = KnownPeers::new(dir.path().join("known"));
        let id = Identity::create();

        peers.trust(&id.public_key()).unwrap();
        peers.trust(&id.public_key()).unwrap();
        assert!(peers.is_known(&id.public_key()));
    }
}
