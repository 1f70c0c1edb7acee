//! Connections handed out after a protocol switch
//!
//! When hyper gives up a connection it also returns whatever it had already
//! read past the end of the HTTP message. Those bytes belong to the tunnel
//! protocol and must be read before anything from the socket.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::connect::BoxedIo;

pin_project! {
    /// A connection with bytes that were read from it before it changed hands.
    ///
    /// Reads are served from the residue until it is empty, then go straight to
    /// the wrapped connection for good. Writes are never touched.
    pub struct BufferedDrainConn<T> {
        residue: Option<Bytes>,
        #[pin]
        inner: T,
    }
}

impl<T> BufferedDrainConn<T> {
    pub fn new(inner: T, residue: Bytes) -> Self {
        let residue = if residue.is_empty() {
            None
        } else {
            Some(residue)
        };
        Self { residue, inner }
    }

    /// Bytes still waiting to be read before the live connection.
    pub fn residue_len(&self) -> usize {
        self.residue.as_ref().map_or(0, Bytes::len)
    }

    pub fn is_drained(&self) -> bool {
        self.residue.is_none()
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Returns the wrapped connection and any residue not yet read.
    pub fn into_inner(self) -> (T, Bytes) {
        (self.inner, self.residue.unwrap_or_default())
    }
}

impl<T: fmt::Debug> fmt::Debug for BufferedDrainConn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedDrainConn")
            .field("residue_len", &self.residue_len())
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T: AsyncRead> AsyncRead for BufferedDrainConn<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        if let Some(residue) = this.residue.as_mut() {
            let n = residue.len().min(buf.remaining());
            buf.put_slice(&residue[..n]);
            residue.advance(n);
            if residue.is_empty() {
                *this.residue = None;
                tracing::trace!("buffered residue drained");
            }
            return Poll::Ready(Ok(()));
        }
        this.inner.poll_read(cx, buf)
    }
}

impl<T: AsyncWrite> AsyncWrite for BufferedDrainConn<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.project().inner.poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        self.project().inner.poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_shutdown(cx)
    }
}

/// The raw connection of a completed protocol switch.
///
/// Which variant is used is decided once, when the connection is taken from
/// the HTTP layer: `Buffered` only if that layer had read ahead.
pub enum SwitchedConn {
    Direct(BoxedIo),
    Buffered(BufferedDrainConn<BoxedIo>),
}

impl SwitchedConn {
    pub fn new(io: BoxedIo, residue: Bytes) -> Self {
        if residue.is_empty() {
            SwitchedConn::Direct(io)
        } else {
            tracing::debug!(residue = residue.len(), "switched connection has buffered residue");
            SwitchedConn::Buffered(BufferedDrainConn::new(io, residue))
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, SwitchedConn::Buffered(_))
    }

    /// Splits into the raw connection and the residue not read yet.
    pub fn into_parts(self) -> (BoxedIo, Bytes) {
        match self {
            SwitchedConn::Direct(io) => (io, Bytes::new()),
            SwitchedConn::Buffered(conn) => conn.into_inner(),
        }
    }
}

impl fmt::Debug for SwitchedConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchedConn::Direct(_) => f.write_str("SwitchedConn::Direct"),
            SwitchedConn::Buffered(conn) => f
                .debug_struct("SwitchedConn::Buffered")
                .field("residue_len", &conn.residue_len())
                .finish(),
        }
    }
}

impl AsyncRead for SwitchedConn {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SwitchedConn::Direct(io) => Pin::new(io).poll_read(cx, buf),
            SwitchedConn::Buffered(conn) => Pin::new(conn).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SwitchedConn {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            SwitchedConn::Direct(io) => Pin::new(io).poll_write(cx, buf),
            SwitchedConn::Buffered(conn) => Pin::new(conn).poll_write(cx, buf),
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            SwitchedConn::Direct(io) => Pin::new(io).poll_write_vectored(cx, bufs),
            SwitchedConn::Buffered(conn) => Pin::new(conn).poll_write_vectored(cx, bufs),
        }
    }

    fn is_write_vectored(&self) -> bool {
        match self {
            SwitchedConn::Direct(io) => io.is_write_vectored(),
            SwitchedConn::Buffered(conn) => conn.is_write_vectored(),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SwitchedConn::Direct(io) => Pin::new(io).poll_flush(cx),
            SwitchedConn::Buffered(conn) => Pin::new(conn).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SwitchedConn::Direct(io) => Pin::new(io).poll_shutdown(cx),
            SwitchedConn::Buffered(conn) => Pin::new(conn).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn residue_is_read_before_live_bytes() {
        let live = tokio_test::io::Builder::new().read(b" world").build();
        let mut conn = BufferedDrainConn::new(live, Bytes::from_static(b"hello"));

        let mut out = Vec::new();
        conn.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
        assert!(conn.is_drained());
    }

    #[tokio::test]
    async fn small_reads_drain_residue_in_order() {
        let live = tokio_test::io::Builder::new().read(b"LIVE").build();
        let mut conn = BufferedDrainConn::new(live, Bytes::from_static(b"abcde"));

        let mut chunk = [0u8; 2];
        assert_eq!(conn.read(&mut chunk).await.unwrap(), 2);
        assert_eq!(&chunk, b"ab");
        assert_eq!(conn.residue_len(), 3);
        assert_eq!(conn.read(&mut chunk).await.unwrap(), 2);
        assert_eq!(&chunk, b"cd");
        assert_eq!(conn.read(&mut chunk).await.unwrap(), 1);
        assert_eq!(&chunk[..1], b"e");
        assert!(conn.is_drained());

        // the last residue read never spills into live bytes
        let mut rest = [0u8; 8];
        let n = conn.read(&mut rest).await.unwrap();
        assert_eq!(&rest[..n], b"LIVE");
    }

    #[tokio::test]
    async fn empty_residue_forwards_immediately() {
        let live = tokio_test::io::Builder::new().read(b"direct").build();
        let mut conn = BufferedDrainConn::new(live, Bytes::new());
        assert!(conn.is_drained());

        let mut out = Vec::new();
        conn.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"direct");
    }

    #[tokio::test]
    async fn writes_pass_through_untouched() {
        let live = tokio_test::io::Builder::new().write(b"outbound").build();
        let mut conn = BufferedDrainConn::new(live, Bytes::from_static(b"pending"));

        conn.write_all(b"outbound").await.unwrap();
        assert_eq!(conn.residue_len(), 7);
    }

    #[tokio::test]
    async fn switched_conn_picks_variant_once() {
        let (near, _far) = tokio::io::duplex(64);
        assert!(!SwitchedConn::new(Box::new(near), Bytes::new()).is_buffered());

        let (near, mut far) = tokio::io::duplex(64);
        let mut conn = SwitchedConn::new(Box::new(near), Bytes::from_static(b"early:"));
        assert!(conn.is_buffered());

        far.write_all(b"late").await.unwrap();
        drop(far);

        let mut out = Vec::new();
        conn.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"early:late");
        // still the buffered variant, but with nothing left to drain
        let (_, residue) = conn.into_parts();
        assert!(residue.is_empty());
    }
}
