//! Where the server writes its single response, and how it takes the
//! connection over afterwards.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_TYPE, UPGRADE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::sync::oneshot;

use crate::connect::BoxedIo;
use crate::error::{self, IntegrationFailure, Result};
use crate::upgrade::UPGRADE_PROTOCOL;

/// Builds a plain-text error response with `msg` as the body.
pub fn error_response(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(format!("{msg}\n"))));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// The write side of one request.
///
/// Consumed by whichever response is written, so a request gets exactly one.
/// It can hijack the connection only if the HTTP layer offered an upgrade
/// for the request.
#[derive(Debug)]
pub struct ResponseSink {
    tx: oneshot::Sender<Response<Full<Bytes>>>,
    on_upgrade: Option<OnUpgrade>,
}

impl ResponseSink {
    /// Takes the upgrade capability out of a request served by hyper.
    pub fn for_request<B>(request: &mut Request<B>) -> (ResponseSink, PendingResponse) {
        let on_upgrade = request.extensions_mut().remove::<OnUpgrade>();
        Self::new(on_upgrade)
    }

    /// A sink that can respond but never hijack.
    pub fn without_hijack() -> (ResponseSink, PendingResponse) {
        Self::new(None)
    }

    fn new(on_upgrade: Option<OnUpgrade>) -> (ResponseSink, PendingResponse) {
        let (tx, rx) = oneshot::channel();
        (ResponseSink { tx, on_upgrade }, PendingResponse { rx })
    }

    pub fn can_hijack(&self) -> bool {
        self.on_upgrade.is_some()
    }

    pub fn send(self, response: Response<Full<Bytes>>) {
        if self.tx.send(response).is_err() {
            tracing::debug!("connection closed before the response was written");
        }
    }

    pub fn error(self, status: StatusCode, msg: &str) {
        self.send(error_response(status, msg));
    }

    /// Writes the 101 and returns the capability to take the connection.
    /// Nothing else may be written through HTTP afterwards.
    pub fn switch_protocols(mut self) -> Result<Hijack> {
        let Some(on_upgrade) = self.on_upgrade.take() else {
            self.error(StatusCode::INTERNAL_SERVER_ERROR, "cannot switch protocols");
            return Err(error::integration(IntegrationFailure::HijackUnsupported));
        };

        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
        let headers = response.headers_mut();
        headers.insert(UPGRADE, HeaderValue::from_static(UPGRADE_PROTOCOL));
        headers.insert(CONNECTION, HeaderValue::from_static("upgrade"));

        self.tx
            .send(response)
            .map_err(|_| error::io(std::io::Error::from(std::io::ErrorKind::ConnectionAborted)))?;
        Ok(Hijack { on_upgrade })
    }
}

/// Exclusive access to the connection, available once the 101 is out.
#[derive(Debug)]
pub struct Hijack {
    on_upgrade: OnUpgrade,
}

impl Hijack {
    /// Waits for the HTTP layer to release the connection. Returns it along
    /// with any bytes the HTTP layer read past the request.
    pub async fn take(self) -> Result<(BoxedIo, Bytes)> {
        let upgraded = self.on_upgrade.await.map_err(error::io)?;
        match upgraded.downcast::<TokioIo<BoxedIo>>() {
            Ok(parts) => Ok((parts.io.into_inner(), parts.read_buf)),
            // Served over some other transport; hyper keeps the residue inside.
            Err(upgraded) => Ok((Box::new(TokioIo::new(upgraded)), Bytes::new())),
        }
    }
}

/// The response future handed to hyper. A sink dropped without responding
/// turns into a 500.
#[derive(Debug)]
pub struct PendingResponse {
    rx: oneshot::Receiver<Response<Full<Bytes>>>,
}

impl PendingResponse {
    pub fn ready(response: Response<Full<Bytes>>) -> PendingResponse {
        let (sink, pending) = ResponseSink::without_hijack();
        sink.send(response);
        pending
    }
}

impl Future for PendingResponse {
    type Output = std::result::Result<Response<Full<Bytes>>, Infallible>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.rx).poll(cx)) {
            Ok(response) => Poll::Ready(Ok(response)),
            Err(_) => {
                tracing::error!("request handler dropped its response sink");
                Poll::Ready(Ok(error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error",
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn error_responses_are_plain_text() {
        let (sink, pending) = ResponseSink::without_hijack();
        assert!(!sink.can_hijack());
        sink.error(StatusCode::BAD_REQUEST, "missing next protocol");

        let response = pending.await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"missing next protocol\n"));
    }

    #[tokio::test]
    async fn dropped_sink_yields_500() {
        let (sink, pending) = ResponseSink::without_hijack();
        drop(sink);
        let response = pending.await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn switching_without_hijack_fails() {
        let (sink, pending) = ResponseSink::without_hijack();
        let err = sink.switch_protocols().unwrap_err();
        assert!(err.is_integration());

        let response = pending.await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"cannot switch protocols\n"));
    }

    #[test]
    fn switching_without_hijack_tolerates_a_closed_connection() {
        let (sink, pending) = ResponseSink::without_hijack();
        drop(pending);
        assert!(sink.switch_protocols().unwrap_err().is_integration());
    }
}
