//! STP — Signed Transfer Protocol.
//!
//! A mutually-authenticated, post-quantum, end-to-end encrypted
//! point-to-point transport over TCP. Two long-term Ed25519 identities
//! introduce themselves in the clear, are pinned by a trust-on-first-use
//! verifier, and then run an ML-KEM-768 handshake that derives a pair of
//! directional XChaCha20-Poly1305 streams and proves mutual possession of
//! them before application traffic flows.
//!
//! See the crate's `dialer`/`server` modules for the two ways to obtain a
//! [`transport::Transport`], and `host::Host` for the process-wide identity
//! and known-peers state both of them need.

pub mod codec;
pub mod config;
pub mod dialer;
pub mod enigma;
pub mod error;
pub mod exchange;
pub mod handshake;
pub mod host;
pub mod identity;
pub mod intro;
pub mod io;
pub mod message;
pub mod peers;
pub mod server;
pub mod transport;

pub use config::Config;
pub use dialer::Dialer;
pub use error::{Result, StpError};
pub use host::Host;
pub use identity::{Identity, RemotePublicKey};
pub use intro::RemoteVerifier;
pub use server::Server;
pub use transport::{RecvHalf, SendHalf, Transport, MAX_TRANSPORT_SIZE};
