//! Length-prefixed framing over an async byte stream.
//!
//! The donor protocol read a single `recv()` per record and assumed it
//! lined up exactly with one `write()` on the other end — an assumption
//! that only holds by accident on a loopback TCP socket. This framing adds
//! an explicit big-endian `u32` length prefix so a record survives being
//! split or coalesced anywhere between the two peers (see DESIGN.md).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, StpError};
use crate::transport::MAX_TRANSPORT_SIZE;

/// Read one length-prefixed frame. `EOF` while reading the length prefix
/// (i.e. the peer closed the connection) surfaces as `ConnClosedByRemote`.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    match r.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(StpError::ConnClosedByRemote)
        }
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_TRANSPORT_SIZE {
        return Err(StpError::MessageTooLarge(len, MAX_TRANSPORT_SIZE));
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .await
        .map_err(|_| StpError::ConnClosedByRemote)?;
    Ok(buf)
}

/// Write one length-prefixed frame as a single buffered write.
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, data: &[u8]) -> Result<()> {
    if data.len() > MAX_TRANSPORT_SIZE {
        return Err(StpError::MessageTooLarge(data.len(), MAX_TRANSPORT_SIZE));
    }
    let len = (data.len() as u32).to_be_bytes();
    let mut frame = Vec::with_capacity(4 + data.len());
    frame.extend_from_slice(&len);
    frame.extend_from_slice(data);
    w.write_all(&frame).await?;
    w.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let (mut a, mut b) = duplex(4096);
        write_frame(&mut a, b"hello frame").await.unwrap();
        let got = read_frame(&mut b).await.unwrap();
        assert_eq!(got, b"hello frame");
    }

    #[tokio::test]
    async fn oversized_write_is_rejected() {
        let (mut a, _b) = duplex(4096);
        let big = vec![0u8; MAX_TRANSPORT_SIZE + 1];
        assert!(write_frame(&mut a, &big).await.is_err());
    }

    #[tokio::test]
    async fn eof_before_frame_is_conn_closed() {
        let (a, mut b) = duplex(4096);
        drop(a);
        match read_frame(&mut b).await {
            Err(StpError::ConnClosedByRemote) => {}
            other => panic!("expected ConnClosedByRemote, got {other:?}"),
        }
    }
}
