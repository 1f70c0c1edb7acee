//! TLS for the fallback attempt and for `https` proxies
//!
//! The TLS layer never advertises ALPN, so the server cannot pick HTTP/2 and
//! the upgrade request always goes out as HTTP/1.1.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;

use super::types::BoxedIo;
use crate::config::DialConfig;
use crate::error::{self, Result, TimedOut};

/// Runs client TLS handshakes over already-dialed streams.
#[derive(Clone)]
pub struct TlsDialer {
    connector: TlsConnector,
    handshake_timeout: Duration,
}

impl TlsDialer {
    /// Builds the client configuration.
    ///
    /// With `insecure` set, certificate chains and names are not verified.
    /// Only meant for tests against self-signed servers.
    pub fn new(config: &DialConfig, insecure: bool) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(error::builder)?;

        let client_config = if insecure {
            tracing::warn!("TLS certificate verification is disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(InsecureVerifier { provider }))
                .with_no_client_auth()
        } else {
            builder
                .with_root_certificates(root_store(config.use_native_certs))
                .with_no_client_auth()
        };

        Ok(Self::from_config(Arc::new(client_config), config.tls_handshake_timeout))
    }

    pub fn from_config(config: Arc<ClientConfig>, handshake_timeout: Duration) -> Self {
        Self {
            connector: TlsConnector::from(config),
            handshake_timeout,
        }
    }

    /// Runs the handshake with `host` as the server name.
    pub async fn handshake(&self, host: &str, io: BoxedIo) -> io::Result<BoxedIo> {
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        let server_name = ServerName::try_from(bare.to_string())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let stream = tokio::time::timeout(self.handshake_timeout, self.connector.connect(server_name, io))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, TimedOut))??;

        tracing::trace!(host = bare, "TLS handshake complete");
        Ok(Box::new(stream))
    }
}

impl std::fmt::Debug for TlsDialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsDialer")
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}

fn root_store(use_native_certs: bool) -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if use_native_certs {
        let native = rustls_native_certs::load_native_certs();
        for e in &native.errors {
            tracing::warn!("failed to load platform certificate: {e}");
        }
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        tracing::debug!(added, ignored, "loaded platform certificates");
    }

    roots
}

/// Accepts any certificate chain but still checks handshake signatures.
#[derive(Debug)]
struct InsecureVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for InsecureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_both_verifier_modes() {
        let config = DialConfig::default();
        TlsDialer::new(&config, false).unwrap();
        TlsDialer::new(&config, true).unwrap();
    }

    #[tokio::test]
    async fn rejects_invalid_server_name() {
        let dialer = TlsDialer::new(&DialConfig::default(), true).unwrap();
        let (client, _server) = tokio::io::duplex(64);
        let err = dialer.handshake("bad host", Box::new(client)).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
