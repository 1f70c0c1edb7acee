//! Server half of the protocol switch

use bytes::Bytes;
use http::header::UPGRADE;
use http::{Request, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tokio::io::AsyncWriteExt;

use super::sink::ResponseSink;
use crate::config::AcceptConfig;
use crate::error::{self, BoxError, IntegrationFailure, NegotiationFailure, Result};
use crate::handshake::HandshakeProtocol;
use crate::upgrade::{SwitchedConn, UPGRADE_PROTOCOL};

/// Upgrades `request` and runs the server side of the inner handshake.
///
/// Exactly one response is written through `sink`, whatever the outcome:
/// an error status if the request is rejected before the switch, the 101
/// otherwise. The caller must not respond to the request itself.
#[tracing::instrument(name = "accept", skip_all, fields(uri = %request.uri()))]
pub async fn accept<P, B>(
    protocol: &P,
    request: Request<B>,
    sink: ResponseSink,
    private: &P::PrivateKey,
    config: &AcceptConfig,
) -> Result<P::Channel>
where
    P: HandshakeProtocol,
    B: Body,
    B::Error: Into<BoxError>,
{
    let next = request
        .headers()
        .get(UPGRADE)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
    match next {
        None => {
            sink.error(StatusCode::BAD_REQUEST, "missing next protocol");
            return Err(error::negotiation(NegotiationFailure::MissingProtocol)
                .with_status(StatusCode::BAD_REQUEST));
        }
        Some(next) if next != UPGRADE_PROTOCOL => {
            sink.error(StatusCode::BAD_REQUEST, "unknown next protocol");
            return Err(error::negotiation(NegotiationFailure::UnknownProtocol(next))
                .with_status(StatusCode::BAD_REQUEST));
        }
        Some(_) => {}
    }

    let init = match read_init(request.into_body(), config.max_init_size).await {
        Ok(init) => init,
        Err(e) if e.is::<LengthLimitError>() => {
            sink.error(StatusCode::PAYLOAD_TOO_LARGE, "request too large");
            return Err(error::io(e).with_status(StatusCode::PAYLOAD_TOO_LARGE));
        }
        Err(e) => {
            sink.error(StatusCode::INTERNAL_SERVER_ERROR, "error reading request");
            return Err(error::io(format!("reading client request body: {e}"))
                .with_status(StatusCode::INTERNAL_SERVER_ERROR));
        }
    };

    if !sink.can_hijack() {
        sink.error(StatusCode::BAD_REQUEST, "make request over HTTP/1");
        return Err(error::integration(IntegrationFailure::HijackUnsupported)
            .with_status(StatusCode::BAD_REQUEST));
    }

    let switched = StatusCode::SWITCHING_PROTOCOLS;
    let hijack = sink.switch_protocols().map_err(|e| e.with_status(switched))?;
    let (mut io, residue) = hijack.take().await.map_err(|e| e.with_status(switched))?;

    // Dropping `io` on failure closes the connection.
    if let Err(e) = io.flush().await {
        return Err(error::io(e).with_status(switched));
    }

    let conn = SwitchedConn::new(io, residue);
    tracing::debug!(buffered = conn.is_buffered(), init_len = init.len(), "connection hijacked");

    let channel = protocol
        .server_handshake(conn, private, init)
        .await
        .map_err(|e| error::handshake(e).with_status(switched))?;
    tracing::debug!("inner handshake complete");
    Ok(channel)
}

async fn read_init<B>(body: B, limit: usize) -> std::result::Result<Bytes, BoxError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    Ok(Limited::new(body, limit).collect().await?.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;
    use crate::handshake::ClientContinuation;
    use http_body_util::Full;

    /// Every case here is rejected before the switch.
    struct Unreachable;

    struct NoContinuation;

    impl ClientContinuation for NoContinuation {
        type Channel = ();

        async fn complete(self, _conn: SwitchedConn) -> std::result::Result<(), BoxError> {
            Ok(())
        }
    }

    impl HandshakeProtocol for Unreachable {
        type PrivateKey = ();
        type PublicKey = ();
        type Channel = ();
        type Continuation = NoContinuation;

        fn client_initiation(
            &self,
            _private: &(),
            _peer: &(),
        ) -> std::result::Result<(Bytes, NoContinuation), BoxError> {
            Ok((Bytes::new(), NoContinuation))
        }

        async fn server_handshake(
            &self,
            _conn: SwitchedConn,
            _private: &(),
            _init: Bytes,
        ) -> std::result::Result<(), BoxError> {
            panic!("handshake must not run")
        }
    }

    fn request(upgrade: Option<&str>, body: &'static [u8]) -> Request<Full<Bytes>> {
        let mut builder = Request::post("/switch");
        if let Some(upgrade) = upgrade {
            builder = builder.header(UPGRADE, upgrade);
        }
        builder.body(Full::new(Bytes::from_static(body))).unwrap()
    }

    async fn run(request: Request<Full<Bytes>>, config: &AcceptConfig) -> (error::Error, StatusCode) {
        let (sink, pending) = ResponseSink::without_hijack();
        let err = accept(&Unreachable, request, sink, &(), config).await.unwrap_err();
        let response = pending.await.unwrap();
        (err, response.status())
    }

    #[tokio::test]
    async fn missing_upgrade_is_rejected_before_hijack() {
        let (err, status) = run(request(None, b"init"), &AcceptConfig::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), Kind::Negotiation);
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert!(err.to_string().contains("no next protocol"));
    }

    #[tokio::test]
    async fn unknown_upgrade_is_rejected() {
        let (err, status) = run(request(Some("websocket"), b"init"), &AcceptConfig::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("\"websocket\""));
    }

    #[tokio::test]
    async fn oversized_initiation_is_rejected() {
        let config = AcceptConfig {
            max_init_size: 2,
            ..AcceptConfig::default()
        };
        let (err, status) = run(request(Some(UPGRADE_PROTOCOL), b"init"), &config).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.kind(), Kind::Io);
    }

    #[tokio::test]
    async fn sink_without_hijack_is_rejected_after_body() {
        let (err, status) = run(request(Some(UPGRADE_PROTOCOL), b"init"), &AcceptConfig::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), Kind::Integration);
    }
}
