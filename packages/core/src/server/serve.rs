//! Hosting server for the switch endpoint
//!
//! Serves HTTP/1.1 with upgrades enabled, routes `POST <path>` to [`accept`]
//! and hands every established channel to the application through an
//! `mpsc` receiver. Each request is accepted on its own task.

use std::fmt;
use std::sync::Arc;

use http::header::ALLOW;
use http::{HeaderValue, Method, Request, StatusCode};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;

use super::accept::accept;
use super::sink::{PendingResponse, ResponseSink, error_response};
use crate::config::{AcceptConfig, Validator};
use crate::connect::{BoxedIo, Io};
use crate::error::{self, Result};
use crate::handshake::HandshakeProtocol;

/// Established channels not yet taken by the application.
const CHANNEL_BACKLOG: usize = 64;

struct Shared<P: HandshakeProtocol> {
    protocol: P,
    private: P::PrivateKey,
    config: AcceptConfig,
    channels: mpsc::Sender<P::Channel>,
}

/// Cheap to clone; clones serve the same endpoint and feed the same receiver.
pub struct Server<P: HandshakeProtocol> {
    shared: Arc<Shared<P>>,
}

impl<P: HandshakeProtocol> Clone for Server<P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<P: HandshakeProtocol> fmt::Debug for Server<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl<P: HandshakeProtocol> Server<P> {
    /// Creates the server and the receiver its channels are delivered on.
    pub fn new(
        protocol: P,
        private: P::PrivateKey,
        config: AcceptConfig,
    ) -> Result<(Self, mpsc::Receiver<P::Channel>)> {
        config.validate().map_err(error::builder)?;
        let (channels, receiver) = mpsc::channel(CHANNEL_BACKLOG);

        let shared = Arc::new(Shared {
            protocol,
            private,
            config,
            channels,
        });
        Ok((Self { shared }, receiver))
    }

    pub fn config(&self) -> &AcceptConfig {
        &self.shared.config
    }

    /// Accepts TCP connections until the listener fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await.map_err(error::io)?;
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.serve_connection(stream).await {
                    tracing::debug!(%peer, "connection error: {e}");
                }
            });
        }
    }

    /// Like [`serve`](Self::serve), behind TLS.
    pub async fn serve_tls(&self, listener: TcpListener, acceptor: TlsAcceptor) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await.map_err(error::io)?;
            let server = self.clone();
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let stream = match acceptor.accept(stream).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::debug!(%peer, "TLS handshake failed: {e}");
                        return;
                    }
                };
                if let Err(e) = server.serve_connection(stream).await {
                    tracing::debug!(%peer, "connection error: {e}");
                }
            });
        }
    }

    /// Serves HTTP/1.1 on one connection until it closes or is switched.
    pub async fn serve_connection<I: Io>(&self, io: I) -> Result<()> {
        let io: BoxedIo = Box::new(io);
        let server = self.clone();
        let service = service_fn(move |request| server.route(request));

        http1::Builder::new()
            .serve_connection(TokioIo::new(io), service)
            .with_upgrades()
            .await
            .map_err(error::io)
    }

    fn route(&self, mut request: Request<Incoming>) -> PendingResponse {
        if request.uri().path() != self.shared.config.path {
            return PendingResponse::ready(error_response(StatusCode::NOT_FOUND, "not found"));
        }
        if request.method() != Method::POST {
            let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
            response.headers_mut().insert(ALLOW, HeaderValue::from_static("POST"));
            return PendingResponse::ready(response);
        }

        let (sink, pending) = ResponseSink::for_request(&mut request);
        let shared = self.shared.clone();
        tokio::spawn(async move {
            let result = accept(&shared.protocol, request, sink, &shared.private, &shared.config).await;
            match result {
                Ok(channel) => {
                    if shared.channels.send(channel).await.is_err() {
                        tracing::debug!("channel receiver dropped, closing new channel");
                    }
                }
                Err(e) => tracing::warn!("accept failed: {e}"),
            }
        });
        pending
    }
}
