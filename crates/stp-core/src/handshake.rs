//! The handshake state machine: KEM exchange, directional AEAD derivation,
//! and the mutual "motto" verification that proves both sides agree on the
//! derived keys before application traffic flows.

use rand_core::{OsRng, RngCore};
use tokio::net::TcpStream;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::codec;
use crate::enigma::{Enigma, BASE_NONCE_SIZE, INFO_CLIENT_TO_SERVER, INFO_SERVER_TO_CLIENT};
use crate::error::{Result, StpError};
use crate::exchange::{self, MlKem};
use crate::identity::{Identity, RemotePublicKey};
use crate::message::{random_padding, Handshake};
use crate::transport::Transport;

/// Fixed list of short phrases used for the post-handshake proof-of-
/// possession echo. Any one is as good as another; what matters is that
/// both sides derive the same bytes from the same motto.
const MOTTOS: &[&str] = &[
    "velvet thunder",
    "silent compass",
    "ember horizon",
    "quiet lighthouse",
];

fn random_motto() -> &'static str {
    let mut idx_byte = [0u8; 1];
    OsRng.fill_bytes(&mut idx_byte);
    MOTTOS[(idx_byte[0] as usize) % MOTTOS.len()]
}

fn random_base_nonce() -> [u8; BASE_NONCE_SIZE] {
    let mut nonce = [0u8; BASE_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

fn mint_session_id() -> String {
    let mut raw = [0u8; 20];
    OsRng.fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

async fn write_handshake_record(
    stream: &mut TcpStream,
    identity: &Identity,
    seq: u64,
    record: &Handshake,
) -> Result<()> {
    let (bytes, _) = codec::serialize(record, identity, seq)?;
    crate::io::write_frame(stream, &bytes).await
}

async fn read_handshake_record(
    stream: &mut TcpStream,
    seq: u64,
    remote_key: &RemotePublicKey,
) -> Result<Handshake> {
    let bytes = crate::io::read_frame(stream).await?;
    let (record, _) = codec::deserialize(&bytes, seq, remote_key)?;
    Ok(record)
}

/// Initiator side of the handshake. Drives the KEM request/response,
/// derives both directional AEADs, and runs the motto proof before
/// returning a ready-to-use `Transport`.
pub async fn request_handshake(
    mut stream: TcpStream,
    identity: Identity,
    remote_key: RemotePublicKey,
) -> Result<Transport> {
    let kem = MlKem::new();
    let our_nonce = random_base_nonce();

    let req = Handshake {
        key: kem.public_key_bytes(),
        nonce: our_nonce.to_vec(),
        session_id: None,
        padding: random_padding(),
    };
    write_handshake_record(&mut stream, &identity, 0, &req).await?;

    let resp = read_handshake_record(&mut stream, 0, &remote_key).await?;
    let session_id = resp.session_id.ok_or(StpError::VerificationFailed)?;
    let peer_nonce = resp.nonce.as_slice();

    let secret = kem.decapsulate(&resp.key)?;
    let encoder = Enigma::new(&secret, &our_nonce, INFO_CLIENT_TO_SERVER)?;
    let decoder = Enigma::new(&secret, peer_nonce, INFO_SERVER_TO_CLIENT)?;

    let transport = Transport::new(
        stream, identity, remote_key, session_id, encoder, decoder, 1, 1,
    );

    let motto = random_motto();
    transport.send(&motto.to_string()).await?;
    let (echoed, _): (String, _) = transport.receive().await?;
    if echoed != motto {
        return Err(StpError::VerificationFailed);
    }

    Ok(transport)
}

/// Responder side of the handshake, symmetric to `request_handshake`.
pub async fn accept_handshake(
    mut stream: TcpStream,
    identity: Identity,
    remote_key: RemotePublicKey,
) -> Result<Transport> {
    let req = read_handshake_record(&mut stream, 0, &remote_key).await?;
    let peer_nonce = req.nonce.clone();

    let (secret, ciphertext) = exchange::encapsulate(&req.key)?;
    let our_nonce = random_base_nonce();
    let session_id = mint_session_id();

    let resp = Handshake {
        key: ciphertext,
        nonce: our_nonce.to_vec(),
        session_id: Some(session_id.clone()),
        padding: random_padding(),
    };
    write_handshake_record(&mut stream, &identity, 0, &resp).await?;

    let encoder = Enigma::new(&secret, &our_nonce, INFO_SERVER_TO_CLIENT)?;
    let decoder = Enigma::new(&secret, &peer_nonce, INFO_CLIENT_TO_SERVER)?;

    let transport = Transport::new(
        stream, identity, remote_key, session_id, encoder, decoder, 1, 1,
    );

    let (motto, _): (String, _) = transport.receive().await?;
    transport.send(&motto).await?;

    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (connected, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (connected.unwrap(), accepted.unwrap().0)
    }

    /// A deliberately buggy initiator that labels its decoder with its own
    /// outbound info string instead of the responder's, reproducing the bug
    /// the motto exchange exists to catch before any application data flows.
    async fn buggy_request_handshake(
        mut stream: TcpStream,
        identity: Identity,
        remote_key: RemotePublicKey,
    ) -> Result<Transport> {
        let kem = MlKem::new();
        let our_nonce = random_base_nonce();

        let req = Handshake {
            key: kem.public_key_bytes(),
            nonce: our_nonce.to_vec(),
            session_id: None,
            padding: random_padding(),
        };
        write_handshake_record(&mut stream, &identity, 0, &req).await?;

        let resp = read_handshake_record(&mut stream, 0, &remote_key).await?;
        let session_id = resp.session_id.ok_or(StpError::VerificationFailed)?;
        let secret = kem.decapsulate(&resp.key)?;

        let encoder = Enigma::new(&secret, &our_nonce, INFO_CLIENT_TO_SERVER)?;
        // Bug: should be INFO_SERVER_TO_CLIENT with resp.nonce.
        let decoder = Enigma::new(&secret, &resp.nonce, INFO_CLIENT_TO_SERVER)?;

        let transport = Transport::new(
            stream, identity, remote_key, session_id, encoder, decoder, 1, 1,
        );

        let motto = random_motto();
        transport.send(&motto.to_string()).await?;
        let (echoed, _): (String, _) = transport.receive().await?;
        if echoed != motto {
            return Err(StpError::VerificationFailed);
        }
        Ok(transport)
    }

    #[tokio::test]
    async fn honest_handshake_reaches_ready_with_matching_session_ids() {
        let (client_stream, server_stream) = tcp_pair().await;
        let client_id = Identity::create();
        let server_id = Identity::create();
        let client_sees = server_id.public_key();
        let server_sees = client_id.public_key();

        let client = request_handshake(client_stream, client_id, client_sees);
        let server = accept_handshake(server_stream, server_id, server_sees);
        let (client, server) = tokio::try_join!(client, server).unwrap();
        assert_eq!(client.session_id(), server.session_id());
    }

    #[tokio::test]
    async fn cross_direction_key_swap_fails_before_ready() {
        let (client_stream, server_stream) = tcp_pair().await;
        let client_id = Identity::create();
        let server_id = Identity::create();
        let client_sees = server_id.public_key();
        let server_sees = client_id.public_key();

        let buggy_client = buggy_request_handshake(client_stream, client_id, client_sees);
        let honest_server = accept_handshake(server_stream, server_id, server_sees);

        let (client_result, server_result) = tokio::join!(buggy_client, honest_server);
        assert!(client_result.is_err());
        assert!(server_result.is_err());
    }
}
