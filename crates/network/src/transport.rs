//! Byte-stream transports the framer reads from and writes to
//!
//! Any `Read + Write` stream is a [`SyncTransport`] and any
//! `AsyncRead + AsyncWrite` stream is an [`AsyncTransport`], so sockets,
//! in-memory pipes and test doubles all plug in unchanged.

use std::io::{ErrorKind, Read, Write};

use async_trait::async_trait;
use mcwire_core::{CodecError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Blocking transport
pub trait SyncTransport {
    /// Block until exactly `length` bytes arrive
    ///
    /// # Errors
    /// `ConnectionClosed` if the stream ends first.
    fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>>;

    /// Write all of `data` and flush
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;
}

impl<T: Read + Write + ?Sized> SyncTransport for T {
    fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut data = vec![0u8; length];
        let mut received = 0;

        while received < length {
            match self.read(&mut data[received..]) {
                Ok(0) => {
                    return Err(CodecError::ConnectionClosed {
                        received,
                        expected: length,
                    })
                }
                Ok(n) => received += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(data)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.write_all(data)?;
        self.flush()?;
        Ok(())
    }
}

/// Cooperative transport, suspending only while waiting on I/O
#[async_trait]
pub trait AsyncTransport: Send {
    /// Wait until exactly `length` bytes arrive
    ///
    /// # Errors
    /// `ConnectionClosed` if the stream ends first.
    async fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>>;

    /// Write all of `data` and flush
    async fn write_bytes(&mut self, data: &[u8]) -> Result<()>;
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> AsyncTransport for T {
    async fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut data = vec![0u8; length];
        let mut received = 0;

        while received < length {
            match self.read(&mut data[received..]).await {
                Ok(0) => {
                    return Err(CodecError::ConnectionClosed {
                        received,
                        expected: length,
                    })
                }
                Ok(n) => received += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(data)
    }

    async fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.write_all(data).await?;
        self.flush().await?;
        Ok(())
    }
}
