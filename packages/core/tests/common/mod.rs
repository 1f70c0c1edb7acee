//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::BoxFuture;
use rustls::ServerConfig;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use switchover_core::connect::{BoxedIo, Dialer, TcpDialer};
use switchover_core::{BoxError, ClientContinuation, HandshakeProtocol, SwitchedConn};

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// A stand-in tunnel protocol. Keys are plain names.
///
/// The initiation is `hello <client> <n>` with `n` counting initiations, so
/// every attempt gets a distinct payload. The server answers `welcome
/// <server>\n` over the switched connection and the client checks that the
/// name matches the one it expects.
#[derive(Debug, Default)]
pub struct EchoProtocol {
    initiations: AtomicUsize,
}

#[derive(Debug)]
pub struct EchoChannel {
    pub conn: SwitchedConn,
    /// Initiation payload the handshake started from.
    pub init: Bytes,
}

#[derive(Debug)]
pub struct EchoContinuation {
    expected: String,
    init: Bytes,
}

impl HandshakeProtocol for EchoProtocol {
    type PrivateKey = String;
    type PublicKey = String;
    type Channel = EchoChannel;
    type Continuation = EchoContinuation;

    fn client_initiation(
        &self,
        private: &String,
        peer: &String,
    ) -> Result<(Bytes, EchoContinuation), BoxError> {
        let n = self.initiations.fetch_add(1, Ordering::SeqCst);
        let init = Bytes::from(format!("hello {private} {n}"));
        let continuation = EchoContinuation {
            expected: peer.clone(),
            init: init.clone(),
        };
        Ok((init, continuation))
    }

    async fn server_handshake(
        &self,
        mut conn: SwitchedConn,
        private: &String,
        init: Bytes,
    ) -> Result<EchoChannel, BoxError> {
        if !init.starts_with(b"hello ") {
            return Err("malformed initiation".into());
        }
        conn.write_all(format!("welcome {private}\n").as_bytes()).await?;
        conn.flush().await?;
        Ok(EchoChannel { conn, init })
    }
}

impl ClientContinuation for EchoContinuation {
    type Channel = EchoChannel;

    async fn complete(self, conn: SwitchedConn) -> Result<EchoChannel, BoxError> {
        let mut reader = BufReader::new(conn);
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let expected = format!("welcome {}\n", self.expected);
        if line != expected {
            return Err(format!("unexpected greeting {line:?}").into());
        }
        // Nothing follows the greeting, so the reader holds no extra bytes.
        Ok(EchoChannel {
            conn: reader.into_inner(),
            init: self.init,
        })
    }
}

/// Dials plain TCP and records every port it was asked to dial.
#[derive(Debug, Clone, Default)]
pub struct CountingDialer {
    inner: TcpDialer,
    dialed: Arc<Mutex<Vec<u16>>>,
}

impl CountingDialer {
    pub fn count(&self, port: u16) -> usize {
        self.dialed
            .lock()
            .unwrap()
            .iter()
            .filter(|&&dialed| dialed == port)
            .count()
    }
}

impl Dialer for CountingDialer {
    fn dial<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, io::Result<BoxedIo>> {
        self.dialed.lock().unwrap().push(port);
        self.inner.dial(host, port)
    }
}

/// A port nothing listens on.
pub async fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// TLS acceptor with a fresh self-signed certificate for `localhost`.
pub fn tls_acceptor() -> TlsAcceptor {
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let cert = rcgen::CertificateParams::new(vec!["localhost".to_string()])
        .unwrap()
        .self_signed(&key_pair)
        .unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let config = ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![cert.der().clone()], key)
    .unwrap();

    TlsAcceptor::from(Arc::new(config))
}

/// Reads until `needle` has been seen, returning everything read.
pub async fn read_until<R: AsyncRead + Unpin>(reader: &mut R, needle: &[u8]) -> Vec<u8> {
    let mut seen = Vec::new();
    let mut buf = [0u8; 1024];
    while !seen.windows(needle.len()).any(|w| w == needle) {
        let n = reader.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before {:?}", String::from_utf8_lossy(needle));
        seen.extend_from_slice(&buf[..n]);
    }
    seen
}

/// A hand-written upgrade request, for talking to the server without a client.
pub fn raw_upgrade_request(upgrade: Option<&str>, body: &str) -> String {
    let upgrade = upgrade
        .map(|value| format!("Upgrade: {value}\r\nConnection: upgrade\r\n"))
        .unwrap_or_default();
    format!(
        "POST /switch HTTP/1.1\r\nHost: 127.0.0.1\r\n{upgrade}Content-Length: {}\r\n\r\n{body}",
        body.len()
    )
}
