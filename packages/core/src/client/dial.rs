//! Client dial sequence: cleartext first, then TLS on the fallback port

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use super::attempt::{AttemptContext, AttemptTarget, ClientAttempt, Scheme};
use crate::config::{ConfigResult, ConfigValidator, ConfigurationError, DialConfig, Validator};
use crate::connect::{Dialer, TcpDialer, TlsDialer};
use crate::error::{self, Result};
use crate::handshake::{ClientContinuation, HandshakeProtocol};
use crate::proxy::{EnvProxy, ProxyResolver};
use crate::upgrade::{DEFAULT_HTTPS_PORT, SwitchedConn};

/// Inputs of one dial. Nothing here changes while the dial runs.
pub struct DialParams<P: HandshakeProtocol> {
    /// Server host, IPv6 literals without brackets.
    pub host: String,
    pub http_port: u16,
    pub https_port: u16,
    /// Our identity.
    pub machine_key: P::PrivateKey,
    /// The identity the server must prove.
    pub control_key: P::PublicKey,
    pub proxy: Arc<dyn ProxyResolver>,
    /// `None` dials plain TCP with the timeouts and socket options of `config`.
    pub dialer: Option<Arc<dyn Dialer>>,
    /// Skip certificate verification on the TLS attempt. For tests.
    pub insecure_tls: bool,
    pub config: DialConfig,
}

impl<P: HandshakeProtocol> DialParams<P> {
    /// Parameters for `addr` (`host:port`), with the TLS fallback on port 443
    /// and proxies taken from the environment.
    pub fn new(addr: &str, machine_key: P::PrivateKey, control_key: P::PublicKey) -> Result<Self> {
        let (host, http_port) = split_host_port(addr).map_err(error::builder)?;
        Ok(Self {
            host,
            http_port,
            https_port: DEFAULT_HTTPS_PORT,
            machine_key,
            control_key,
            proxy: Arc::new(EnvProxy::from_env()),
            dialer: None,
            insecure_tls: false,
            config: DialConfig::default(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_host(&self.host).map_err(error::builder)?;
        ConfigValidator::validate_port(self.http_port, "http_port").map_err(error::builder)?;
        ConfigValidator::validate_port(self.https_port, "https_port").map_err(error::builder)?;
        self.config.validate().map_err(error::builder)
    }
}

impl<P: HandshakeProtocol> fmt::Debug for DialParams<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialParams")
            .field("host", &self.host)
            .field("http_port", &self.http_port)
            .field("https_port", &self.https_port)
            .field("insecure_tls", &self.insecure_tls)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Splits `host:port`. IPv6 hosts must be bracketed, and come back without
/// the brackets.
pub fn split_host_port(addr: &str) -> ConfigResult<(String, u16)> {
    let invalid = || ConfigurationError::InvalidAddress(format!("{addr:?} is not host:port"));

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, rest) = rest.split_once(']').ok_or_else(invalid)?;
        let port = rest.strip_prefix(':').ok_or_else(invalid)?;
        (host, port)
    } else {
        let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
        if host.contains(':') {
            return Err(invalid());
        }
        (host, port)
    };

    let port = port.parse::<u16>().map_err(|_| invalid())?;
    ConfigValidator::validate_host(host)?;
    Ok((host.to_string(), port))
}

/// Runs the dial sequence for one set of parameters.
pub struct ClientDialer<P: HandshakeProtocol> {
    protocol: P,
    params: DialParams<P>,
    context: AttemptContext,
}

impl<P: HandshakeProtocol> ClientDialer<P> {
    /// Validates the parameters and prepares the TLS configuration. No
    /// network activity happens here.
    pub fn new(protocol: P, params: DialParams<P>) -> Result<Self> {
        params.validate()?;

        let dialer = match &params.dialer {
            Some(dialer) => dialer.clone(),
            None => Arc::new(TcpDialer::new(&params.config)),
        };
        let context = AttemptContext {
            proxy: params.proxy.clone(),
            dialer,
            tls: TlsDialer::new(&params.config, params.insecure_tls)?,
            config: params.config.clone(),
        };

        Ok(Self {
            protocol,
            params,
            context,
        })
    }

    pub fn params(&self) -> &DialParams<P> {
        &self.params
    }

    pub async fn dial(&self) -> Result<P::Channel> {
        self.dial_with_cancel(&CancellationToken::new()).await
    }

    /// Dials until the channel is established, both attempts failed, or
    /// `cancel` fires. Canceling drops whatever connection is in flight.
    #[tracing::instrument(name = "dial", skip_all, fields(host = %self.params.host))]
    pub async fn dial_with_cancel(&self, cancel: &CancellationToken) -> Result<P::Channel> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("dial canceled");
                Err(error::canceled())
            }
            result = self.dial_attempts() => result,
        }
    }

    async fn dial_attempts(&self) -> Result<P::Channel> {
        let host = self.params.host.as_str();

        let target = AttemptTarget::new(Scheme::Http, host, self.params.http_port);
        let (init, continuation) = self.initiation()?;
        let http_err = match ClientAttempt::new(&self.context, target).run(init).await {
            Ok(conn) => return self.complete(continuation, conn).await,
            Err(e) if e.is_fallback_eligible() => e,
            Err(e) => return Err(e),
        };

        tracing::info!("cleartext attempt failed, trying TLS: {http_err}");

        // A payload is never reused: the first one may have reached the server.
        let target = AttemptTarget::new(Scheme::Https, host, self.params.https_port);
        let (init, continuation) = self.initiation()?;
        match ClientAttempt::new(&self.context, target).run(init).await {
            Ok(conn) => self.complete(continuation, conn).await,
            Err(https_err) => {
                tracing::warn!("all connection attempts failed");
                Err(error::exhausted(http_err, https_err))
            }
        }
    }

    fn initiation(&self) -> Result<(Bytes, P::Continuation)> {
        self.protocol
            .client_initiation(&self.params.machine_key, &self.params.control_key)
            .map_err(error::handshake)
    }

    async fn complete(&self, continuation: P::Continuation, conn: SwitchedConn) -> Result<P::Channel> {
        // The continuation owns the connection; on failure it is dropped and closed.
        let channel = continuation.complete(conn).await.map_err(error::handshake)?;
        tracing::debug!("inner handshake complete");
        Ok(channel)
    }
}

impl<P: HandshakeProtocol> fmt::Debug for ClientDialer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientDialer")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Dials `params.host` with `protocol`, honoring `cancel`.
pub async fn dial<P: HandshakeProtocol>(
    protocol: P,
    params: DialParams<P>,
    cancel: &CancellationToken,
) -> Result<P::Channel> {
    ClientDialer::new(protocol, params)?
        .dial_with_cancel(cancel)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_host_and_port() {
        assert_eq!(
            split_host_port("control.example:8080").unwrap(),
            ("control.example".to_string(), 8080)
        );
        assert_eq!(split_host_port("[fd7a::1]:80").unwrap(), ("fd7a::1".to_string(), 80));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for addr in ["control.example", "fd7a::1:80", "[fd7a::1]", "host:http", ":80", "a b:80"] {
            assert!(split_host_port(addr).is_err(), "{addr}");
        }
    }
}
