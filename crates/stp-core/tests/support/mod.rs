//! Shared scaffolding for the integration tests: a loopback TCP pair and a
//! convenience helper that drives a full handshake over it.

use stp_core::handshake::{accept_handshake, request_handshake};
use stp_core::identity::Identity;
use stp_core::transport::Transport;
use tokio::net::{TcpListener, TcpStream};

/// A connected pair of TCP sockets on loopback, one end of each.
pub async fn tcp_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (connected, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    (connected.unwrap(), accepted.unwrap().0)
}

/// Run a full initiator/responder handshake over a fresh loopback pair with
/// fresh identities, each side having pinned the other's key as if TOFU had
/// already run. Returns `(initiator, responder)`.
pub async fn handshake_pair() -> (Transport, Transport) {
    let (client_stream, server_stream) = tcp_pair().await;
    let client_id = Identity::create();
    let server_id = Identity::create();
    let client_sees = server_id.public_key();
    let server_sees = client_id.public_key();

    let client_fut = request_handshake(client_stream, client_id, client_sees);
    let server_fut = accept_handshake(server_stream, server_id, server_sees);

    let (client, server) = tokio::try_join!(client_fut, server_fut).unwrap();
    (client, server)
}
