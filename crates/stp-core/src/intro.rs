//! Introduction: the plaintext exchange of long-term public keys, and the
//! pluggable policy point that decides whether to trust the result.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{Result, StpError};
use crate::identity::{Identity, RemotePublicKey};
use crate::message::{random_padding, Introduce};
use crate::peers::KnownPeers;

/// The policy point where a session can be aborted for identity reasons.
/// Implementations decide whether to proceed with a peer whose long-term
/// public key was just received, in the clear, for the first time.
#[async_trait]
pub trait RemoteVerifier: Send + Sync {
    async fn verify(&self, peer: &RemotePublicKey) -> Result<()>;
}

/// Trust-on-first-use: prompts the user on stdin/stdout for any peer not
/// already in the known-peers set, and remembers their answer. Owns its
/// `KnownPeers` handle (shared via `Arc` with `Host`) so it can be boxed as
/// a `'static` `RemoteVerifier` and handed to `Dialer`/`Server`.
pub struct TofuVerifier {
    pub known_peers: Arc<KnownPeers>,
}

#[async_trait]
impl RemoteVerifier for TofuVerifier {
    async fn verify(&self, peer: &RemotePublicKey) -> Result<()> {
        let encoded = BASE64.encode(peer.marshal());
        let already_known = self.known_peers.is_known(peer);

        if already_known {
            println!("peer {encoded} is already trusted");
            return Ok(());
        }

        println!("unknown peer: {encoded}");
        print!("proceed? (y/N) ");
        use std::io::Write as _;
        std::io::stdout().flush().ok();

        let answer = tokio::task::spawn_blocking(read_line_blocking)
            .await
            .map_err(|_| StpError::VerificationFailed)??;

        let accepted = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
        if !accepted {
            return Err(StpError::VerificationFailed);
        }

        if let Err(e) = self.known_peers.trust(peer) {
            tracing::warn!(error = %e, "failed to persist newly trusted peer");
        }
        Ok(())
    }
}

fn read_line_blocking() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}

/// Send our own `Introduce` record, unauthenticated and in the clear.
pub async fn send_introduction(stream: &mut TcpStream, identity: &Identity) -> Result<()> {
    let introduce = Introduce {
        public: identity.marshal_public_key(),
        padding: random_padding(),
    };
    let bytes = bincode::serialize(&introduce)?;
    crate::io::write_frame(stream, &bytes).await
}

/// Read the peer's `Introduce` record and parse its public key.
pub async fn receive_introduction(stream: &mut TcpStream) -> Result<RemotePublicKey> {
    let bytes = crate::io::read_frame(stream).await?;
    let introduce: Introduce = bincode::deserialize(&bytes)?;
    RemotePublicKey::parse(&introduce.public)
}

/// Dialer side: send our introduction first, then read the peer's. The
/// dialer verifies only after both records have crossed the wire.
pub async fn dial_introduction(
    stream: &mut TcpStream,
    identity: &Identity,
) -> Result<RemotePublicKey> {
    send_introduction(stream, identity).await?;
    receive_introduction(stream).await
}
