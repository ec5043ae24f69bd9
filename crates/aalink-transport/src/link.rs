//! Physical link abstraction.
//!
//! A [`Link`] splits into a reader and a writer half. The reader yields
//! whatever chunk the physical layer delivers (USB returns up to one bulk
//! transfer, TCP whatever the OS has buffered); the writer accepts some
//! prefix of the offered bytes. The transport base turns these into
//! exact-size logical operations.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::error::{Result, TransportError};

/// Reading half of a physical link.
#[async_trait]
pub trait LinkReader: Send + 'static {
    /// Read one physical chunk into `buf`. Returns the number of bytes
    /// read; 0 means the peer closed the link.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Writing half of a physical link.
#[async_trait]
pub trait LinkWriter: Send + 'static {
    /// Write some prefix of `buf`. Returns the number of bytes accepted.
    async fn write_chunk(&mut self, buf: &[u8]) -> Result<usize>;
}

/// A duplex physical link that can be split into its two directions.
pub trait Link: Send + 'static {
    type Reader: LinkReader;
    type Writer: LinkWriter;

    fn into_split(self) -> (Self::Reader, Self::Writer);
}

/// Adapter making any async byte stream usable as a [`Link`].
pub struct IoLink<T>(pub T);

/// Reader half of an [`IoLink`].
pub struct IoReader<R>(R);

/// Writer half of an [`IoLink`].
pub struct IoWriter<W>(W);

impl<T> Link for IoLink<T>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    type Reader = IoReader<ReadHalf<T>>;
    type Writer = IoWriter<WriteHalf<T>>;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        let (read, write) = tokio::io::split(self.0);
        (IoReader(read), IoWriter(write))
    }
}

#[async_trait]
impl<R> LinkReader for IoReader<R>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.0.read(buf).await.map_err(TransportError::from)
    }
}

#[async_trait]
impl<W> LinkWriter for IoWriter<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    async fn write_chunk(&mut self, buf: &[u8]) -> Result<usize> {
        self.0.write(buf).await.map_err(TransportError::from)
    }
}
