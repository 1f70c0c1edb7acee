//! Single-request HTTP/1.1 client connection
//!
//! Each transport owns one connection and carries exactly one request. The
//! task driving the connection gives the connection back through a
//! [`ConnectionSignal`] once hyper lets go of it, which for a protocol switch
//! (or a successful `CONNECT`) happens right after the response head.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::task::JoinHandle;

use crate::connect::BoxedIo;
use crate::error::{self, Result};
use crate::upgrade::{ConnectionExtractor, ConnectionSignal, SwitchedConn};

/// Aborts the connection task when the attempt is abandoned.
#[derive(Debug)]
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// An HTTP/1.1 connection good for one request.
#[derive(Debug)]
pub struct SingleUseTransport {
    sender: http1::SendRequest<Full<Bytes>>,
    extractor: ConnectionExtractor<SwitchedConn>,
    driver: AbortOnDrop,
}

impl SingleUseTransport {
    /// Performs the client side of the HTTP/1.1 connection setup over `io`.
    pub async fn handshake(io: BoxedIo) -> Result<Self> {
        let (sender, conn) = http1::Builder::new()
            .handshake::<_, Full<Bytes>>(TokioIo::new(io))
            .await
            .map_err(error::transport)?;

        let (signal, extractor) = ConnectionExtractor::channel();
        let driver = tokio::spawn(drive(conn, signal));

        Ok(Self {
            sender,
            extractor,
            driver: AbortOnDrop(driver),
        })
    }

    /// Sends the one request this transport will ever carry.
    pub async fn round_trip(mut self, request: Request<Full<Bytes>>) -> Result<RoundTrip> {
        self.sender.ready().await.map_err(error::transport)?;
        let response = self
            .sender
            .send_request(request)
            .await
            .map_err(error::transport)?;

        Ok(RoundTrip {
            response,
            extractor: self.extractor,
            driver: self.driver,
        })
    }
}

async fn drive(
    conn: http1::Connection<TokioIo<BoxedIo>, Full<Bytes>>,
    signal: ConnectionSignal<SwitchedConn>,
) {
    match conn.without_shutdown().await {
        Ok(parts) => signal.fire(SwitchedConn::new(parts.io.into_inner(), parts.read_buf)),
        Err(e) => tracing::debug!("client connection ended: {e}"),
    }
}

/// A response, with the connection it arrived on still held by the driver.
#[derive(Debug)]
pub struct RoundTrip {
    response: Response<Incoming>,
    extractor: ConnectionExtractor<SwitchedConn>,
    driver: AbortOnDrop,
}

impl RoundTrip {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// Reads at most `limit` bytes of the body. A body that fails part way
    /// yields what was read before the failure.
    pub async fn read_body(&mut self, limit: usize) -> Bytes {
        let body = self.response.body_mut();
        let mut collected = BytesMut::new();

        while collected.len() < limit {
            match body.frame().await {
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data() {
                        let take = data.len().min(limit - collected.len());
                        collected.extend_from_slice(&data[..take]);
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!("failed to read response body: {e}");
                    break;
                }
                None => break,
            }
        }

        collected.freeze()
    }

    /// Waits for the driver to hand the connection back.
    ///
    /// Awaiting cannot hang: the response has already arrived, so the
    /// `without_shutdown` driver is past the exchange and either fires the
    /// signal with its parts or fails and drops it. `try_extract` is the
    /// non-waiting form for callers that cannot await.
    pub async fn into_connection(self) -> Result<SwitchedConn> {
        let RoundTrip {
            extractor, driver, ..
        } = self;
        let conn = extractor.extract().await;
        drop(driver);
        conn
    }
}
