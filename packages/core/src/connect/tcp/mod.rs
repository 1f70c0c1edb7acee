//! TCP dialing

pub mod socket_config;

use std::io;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::net::TcpStream;

pub use socket_config::configure_tcp_socket;

use super::dialer::Dialer;
use super::types::BoxedIo;
use crate::config::{DialConfig, TcpConfig};
use crate::error::TimedOut;

/// Dials with `tokio`'s resolver and applies the socket options afterwards.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    connect_timeout: Duration,
    tcp: TcpConfig,
}

impl TcpDialer {
    pub fn new(config: &DialConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            tcp: config.tcp.clone(),
        }
    }

    pub async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, TimedOut))??;

        if let Err(e) = configure_tcp_socket(&stream, &self.tcp) {
            tracing::warn!(host, port, "failed to configure TCP socket: {e}");
        }
        Ok(stream)
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new(&DialConfig::default())
    }
}

impl Dialer for TcpDialer {
    fn dial<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, io::Result<BoxedIo>> {
        Box::pin(async move {
            let stream = self.connect(host, port).await?;
            tracing::trace!(host, port, "TCP connection established");
            Ok(Box::new(stream) as BoxedIo)
        })
    }
}
