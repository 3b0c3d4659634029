//! TCP accept loop: one task per connection, each driving introduction,
//! verification, and the responder handshake before handing a ready
//! `Transport` to the caller's handler.

use std::future::Future;
use std::sync::Arc;

use tokio::net::{TcpListener, ToSocketAddrs};

use crate::error::Result;
use crate::handshake;
use crate::host::Host;
use crate::intro::RemoteVerifier;
use crate::transport::Transport;

/// Binds an address and spawns one task per accepted connection.
pub struct Server<H> {
    host: Host,
    verifier: Arc<dyn RemoteVerifier>,
    handler: Arc<H>,
}

impl<H, Fut> Server<H>
where
    H: Fn(Transport) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    /// A server using the host's default trust-on-first-use verifier.
    pub fn new(host: Host, handler: H) -> Self {
        let verifier = host.tofu_verifier();
        Self {
            host,
            verifier,
            handler: Arc::new(handler),
        }
    }

    /// A server using a caller-supplied verifier for every accepted
    /// connection.
    pub fn with_verifier(host: Host, verifier: Arc<dyn RemoteVerifier>, handler: H) -> Self {
        Self {
            host,
            verifier,
            handler: Arc::new(handler),
        }
    }

    /// Bind `addr` and serve forever. Accept errors are logged and do not
    /// stop the loop; an error from a single connection's task is logged
    /// and does not affect other connections.
    pub async fn listen_and_serve(&self, addr: impl ToSocketAddrs) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(local_addr = ?listener.local_addr().ok(), "listening");
        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };
            let host = self.host.clone();
            let verifier = self.verifier.clone();
            let handler = self.handler.clone();
            let connection = tokio::spawn(async move {
                if let Err(e) = serve_one(stream, host, verifier, handler.as_ref()).await {
                    tracing::warn!(peer = %peer_addr, error = %e, "connection failed");
                }
            });
            // `serve_one` covers the handshake and the user handler; a panic
            // anywhere in that path would otherwise only reach the default
            // panic hook. Surface it through the same logging path as an
            // ordinary connection error.
            tokio::spawn(async move {
                if let Err(join_err) = connection.await {
                    tracing::error!(peer = %peer_addr, error = %join_err, "connection task panicked");
                }
            });
        }
    }
}

async fn serve_one<H, Fut>(
    mut stream: tokio::net::TcpStream,
    host: Host,
    verifier: Arc<dyn RemoteVerifier>,
    handler: &H,
) -> Result<()>
where
    H: Fn(Transport) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let identity = host.identity().clone();
    let remote = crate::intro::receive_introduction(&mut stream).await?;

    verifier.verify(&remote).await?;

    crate::intro::send_introduction(&mut stream, &identity).await?;

    let transport = handshake::accept_handshake(stream, identity, remote).await?;
    tracing::debug!(session_id = transport.session_id(), "handshake complete");
    handler(transport).await
}
