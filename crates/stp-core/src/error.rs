//! The error taxonomy shared by every layer of the protocol.
//!
//! Cryptographic and protocol failures are fatal to the connection they occur
//! on; resource failures surface to the caller that asked for the resource.
//! There is no retry policy here — a failed handshake or a failed record
//! always tears down the `Transport` it happened on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StpError {
    // --- Cryptographic ---
    #[error("ciphertext failed to authenticate")]
    InvalidCiphertext,

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("base nonce must be 16 bytes, got {0}")]
    InvalidNonceLength(usize),

    #[error("invalid or unsupported key")]
    InvalidKey,

    #[error("key encapsulation failed: {0}")]
    Kem(String),

    // --- Protocol ---
    #[error("expected sequence {expected}, got {got}")]
    InvalidSeqNumber { expected: u64, got: u64 },

    #[error("peer verification failed")]
    VerificationFailed,

    #[error("connection closed by remote")]
    ConnClosedByRemote,

    // --- Resource ---
    #[error("file not found")]
    MissingFile,

    #[error("no PEM block found")]
    MissingPem,

    #[error("connection already closed")]
    AlreadyClosed,

    // --- Transport ---
    #[error("record of {0} bytes exceeds the {1}-byte transport limit")]
    MessageTooLarge(usize, usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] Box<bincode::ErrorKind>),
}

pub type Result<T> = std::result::Result<T, StpError>;
