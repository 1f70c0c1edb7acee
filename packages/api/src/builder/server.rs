//! Server builder

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use switchover_core::{AcceptConfig, HandshakeProtocol, Result, Server};

/// Collects the endpoint settings of a hosting server.
pub struct ServerBuilder<P: HandshakeProtocol> {
    protocol: P,
    private: P::PrivateKey,
    config: AcceptConfig,
}

impl<P: HandshakeProtocol> ServerBuilder<P> {
    pub fn new(protocol: P, private: P::PrivateKey) -> Self {
        Self {
            protocol,
            private,
            config: AcceptConfig::default(),
        }
    }

    /// Request path of the switch endpoint. Defaults to `/switch`.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Largest initiation payload accepted.
    #[must_use]
    pub fn max_init_size(mut self, size: usize) -> Self {
        self.config.max_init_size = size;
        self
    }

    #[must_use]
    pub fn config(mut self, config: AcceptConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<(Server<P>, mpsc::Receiver<P::Channel>)> {
        Server::new(self.protocol, self.private, self.config)
    }

    /// Serves cleartext HTTP on `listener` in a background task.
    pub fn spawn(
        self,
        listener: TcpListener,
    ) -> Result<(mpsc::Receiver<P::Channel>, JoinHandle<Result<()>>)> {
        let (server, channels) = self.build()?;
        let task = tokio::spawn(async move { server.serve(listener).await });
        Ok((channels, task))
    }

    /// Serves HTTPS on `listener` in a background task.
    pub fn spawn_tls(
        self,
        listener: TcpListener,
        acceptor: TlsAcceptor,
    ) -> Result<(mpsc::Receiver<P::Channel>, JoinHandle<Result<()>>)> {
        let (server, channels) = self.build()?;
        let task = tokio::spawn(async move { server.serve_tls(listener, acceptor).await });
        Ok((channels, task))
    }
}
