//! Exercises the full production path: `Host` loading identities from disk,
//! `Server` accepting and `Dialer` connecting with a non-interactive
//! always-accept verifier, end to end over a real TCP socket.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::oneshot;

use stp_core::identity::RemotePublicKey;
use stp_core::intro::RemoteVerifier;
use stp_core::{Dialer, Host, Server, Transport};

struct AlwaysAccept;

#[async_trait]
impl RemoteVerifier for AlwaysAccept {
    async fn verify(&self, _peer: &RemotePublicKey) -> stp_core::Result<()> {
        Ok(())
    }
}

fn host_in(dir: &TempDir) -> Host {
    Host::load_or_create(&dir.path().join("id.key"), &dir.path().join("known")).unwrap()
}

#[tokio::test]
async fn dial_and_serve_exchange_a_message() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    let server_host = host_in(&server_dir);
    let client_host = host_in(&client_dir);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener); // Server binds its own listener on the same address below.

    let (got_message_tx, got_message_rx) = oneshot::channel();
    let got_message_tx = std::sync::Mutex::new(Some(got_message_tx));

    let server = Server::with_verifier(
        server_host,
        Arc::new(AlwaysAccept) as Arc<dyn RemoteVerifier>,
        move |transport: Transport| {
            let got_message_tx = got_message_tx.lock().unwrap().take();
            async move {
                let (msg, _): (String, _) = transport.receive().await?;
                if let Some(tx) = got_message_tx {
                    let _ = tx.send(msg);
                }
                Ok(())
            }
        },
    );

    let server_task = tokio::spawn(async move {
        let _ = server.listen_and_serve(addr).await;
    });

    // Give the listener a moment to bind before dialing.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let dialer = Dialer::with_verifier(client_host, Arc::new(AlwaysAccept));
    let transport = dialer.dial(addr).await.unwrap();
    transport.send(&"hi from the dialer".to_string()).await.unwrap();

    let received = tokio::time::timeout(std::time::Duration::from_secs(5), got_message_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, "hi from the dialer");

    server_task.abort();
}
