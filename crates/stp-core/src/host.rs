//! The only process-wide state: the loaded identity and the known-peers
//! set, bundled behind one value passed explicitly into `Server`/`Dialer`
//! rather than initialized by a module-level side effect.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::identity::Identity;
use crate::peers::KnownPeers;

#[derive(Clone)]
pub struct Host {
    identity: Identity,
    known_peers: Arc<KnownPeers>,
}

impl Host {
    /// Load the identity at `identity_path` (creating one if absent) and
    /// open the known-peers set at `known_peers_path`. This is the only
    /// place in the crate that performs filesystem I/O as part of startup.
    pub fn load_or_create(identity_path: &Path, known_peers_path: &Path) -> Result<Self> {
        let identity = Identity::load_or_create(identity_path)?;
        let known_peers = Arc::new(KnownPeers::new(known_peers_path.to_path_buf()));
        Ok(Self {
            identity,
            known_peers,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn known_peers(&self) -> Arc<KnownPeers> {
        self.known_peers.clone()
    }

    /// A ready-made trust-on-first-use verifier backed by this host's
    /// known-peers set, for callers that don't supply their own.
    pub fn tofu_verifier(&self) -> Arc<dyn crate::intro::RemoteVerifier> {
        Arc::new(crate::intro::TofuVerifier {
            known_peers: self.known_peers(),
        })
    }
}
