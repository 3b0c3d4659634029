//! Post-handshake transport: send/receive over a pair of directional AEADs,
//! with monotonic per-direction sequence counters and a read/write half
//! split mirroring `tokio::net::TcpStream::into_split`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::codec;
use crate::enigma::Enigma;
use crate::error::{Result, StpError};
use crate::identity::{Identity, RemotePublicKey};
use crate::message::Metadata;

/// A single `SignedTransport`, once sealed, must not exceed this many bytes
/// on the wire.
pub const MAX_TRANSPORT_SIZE: usize = 10 * 1024;

struct Shared {
    identity: Identity,
    remote_key: RemotePublicKey,
    session_id: String,
    closed: AtomicBool,
}

/// The send-only half of an established Transport. Single-writer by
/// construction: it owns the write half of the socket and the outbound
/// counter.
pub struct SendHalf {
    writer: WriteHalf<TcpStream>,
    encoder: Enigma,
    sent: AtomicU64,
    shared: Arc<Shared>,
}

/// The receive-only half. Single-reader by construction.
pub struct RecvHalf {
    reader: ReadHalf<TcpStream>,
    decoder: Enigma,
    received: AtomicU64,
    shared: Arc<Shared>,
}

impl SendHalf {
    /// Serialize, sign, seal, and write `msg`. Advances the sent-counter on
    /// success; a failed send leaves it unchanged.
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<Metadata> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(StpError::AlreadyClosed);
        }
        let seq = self.sent.load(Ordering::SeqCst);
        let (plaintext, metadata) = codec::serialize(msg, &self.shared.identity, seq)?;
        let sealed = self.encoder.encrypt(&plaintext, seq)?;
        crate::io::write_frame(&mut self.writer, &sealed).await?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(metadata)
    }

    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

impl RecvHalf {
    /// Read, unseal, verify, and deserialize the next record. Advances the
    /// received-counter on success.
    pub async fn receive<T: DeserializeOwned>(&mut self) -> Result<(T, Metadata)> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(StpError::AlreadyClosed);
        }
        let seq = self.received.load(Ordering::SeqCst);
        let sealed = crate::io::read_frame(&mut self.reader).await?;
        let plaintext = self.decoder.decrypt(&sealed, seq)?;
        let (msg, metadata) = codec::deserialize(&plaintext, seq, &self.shared.remote_key)?;
        self.received.fetch_add(1, Ordering::SeqCst);
        Ok((msg, metadata))
    }

    pub fn received_count(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }
}

/// An established, authenticated, encrypted channel. Produced only by the
/// handshake state machine.
pub struct Transport {
    send: Mutex<SendHalf>,
    recv: Mutex<RecvHalf>,
    shared: Arc<Shared>,
}

impl Transport {
    pub(crate) fn new(
        stream: TcpStream,
        identity: Identity,
        remote_key: RemotePublicKey,
        session_id: String,
        encoder: Enigma,
        decoder: Enigma,
        sent_start: u64,
        received_start: u64,
    ) -> Self {
        let shared = Arc::new(Shared {
            identity,
            remote_key,
            session_id,
            closed: AtomicBool::new(false),
        });
        let (reader, writer) = tokio::io::split(stream);
        Transport {
            send: Mutex::new(SendHalf {
                writer,
                encoder,
                sent: AtomicU64::new(sent_start),
                shared: shared.clone(),
            }),
            recv: Mutex::new(RecvHalf {
                reader,
                decoder,
                received: AtomicU64::new(received_start),
                shared: shared.clone(),
            }),
            shared,
        }
    }

    pub async fn send<T: Serialize>(&self, msg: &T) -> Result<Metadata> {
        self.send.lock().await.send(msg).await
    }

    pub async fn receive<T: DeserializeOwned>(&self) -> Result<(T, Metadata)> {
        self.recv.lock().await.receive().await
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Split into independent send/receive halves, e.g. to hand each to its
    /// own task. `send`/`receive` on the original `Transport` remain usable
    /// concurrently with the halves via the shared closed-flag, but the
    /// underlying socket halves are moved out, so this is typically called
    /// once right after the handshake completes.
    pub fn into_split(self) -> (SendHalf, RecvHalf) {
        (self.send.into_inner(), self.recv.into_inner())
    }

    /// Close the underlying connection. A second call returns `AlreadyClosed`.
    pub async fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Err(StpError::AlreadyClosed);
        }
        use tokio::io::AsyncWriteExt;
        let mut guard = self.send.lock().await;
        let _ = guard.writer.shutdown().await;
        Ok(())
    }
}
