//! TCP dial: introduction, verification, and the initiator handshake,
//! producing a ready `Transport`.

use std::sync::Arc;

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::handshake;
use crate::host::Host;
use crate::intro::{self, RemoteVerifier};
use crate::transport::Transport;

pub struct Dialer {
    host: Host,
    verifier: Arc<dyn RemoteVerifier>,
}

impl Dialer {
    /// A dialer using the host's default trust-on-first-use verifier.
    pub fn new(host: Host) -> Self {
        let verifier = host.tofu_verifier();
        Self { host, verifier }
    }

    /// A dialer using a caller-supplied verifier, e.g. one that refuses
    /// unknown keys outright instead of prompting.
    pub fn with_verifier(host: Host, verifier: Arc<dyn RemoteVerifier>) -> Self {
        Self { host, verifier }
    }

    /// Connect to `addr`, exchange introductions, verify the peer, and run
    /// the initiator handshake.
    pub async fn dial(&self, addr: impl ToSocketAddrs) -> Result<Transport> {
        let mut stream = TcpStream::connect(addr).await?;
        let identity = self.host.identity().clone();

        let remote = intro::dial_introduction(&mut stream, &identity).await?;
        self.verifier.verify(&remote).await?;

        handshake::request_handshake(stream, identity, remote).await
    }
}
