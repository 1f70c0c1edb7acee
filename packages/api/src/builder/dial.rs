//! Client builder

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use switchover_core::client::{ClientDialer, DialParams};
use switchover_core::{DialConfig, Dialer, Direct, HandshakeProtocol, ProxyResolver, Result};

/// Collects dial settings for one server address.
///
/// Created by [`Switchover::dial`](crate::Switchover::dial). The inner
/// protocol and keys are only supplied at the end, by [`connect`](Self::connect)
/// or [`build`](Self::build).
#[derive(Clone)]
pub struct DialBuilder {
    addr: String,
    https_port: Option<u16>,
    proxy: Option<Arc<dyn ProxyResolver>>,
    dialer: Option<Arc<dyn Dialer>>,
    insecure_tls: bool,
    config: DialConfig,
    cancel: Option<CancellationToken>,
}

impl DialBuilder {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            https_port: None,
            proxy: None,
            dialer: None,
            insecure_tls: false,
            config: DialConfig::default(),
            cancel: None,
        }
    }

    /// Port of the TLS fallback attempt. Defaults to 443.
    #[must_use]
    pub fn https_port(mut self, port: u16) -> Self {
        self.https_port = Some(port);
        self
    }

    /// Replaces proxy discovery from the environment.
    #[must_use]
    pub fn proxy<R: ProxyResolver>(mut self, resolver: R) -> Self {
        self.proxy = Some(Arc::new(resolver));
        self
    }

    /// Never use a proxy.
    #[must_use]
    pub fn no_proxy(self) -> Self {
        self.proxy(Direct)
    }

    #[must_use]
    pub fn dialer<D: Dialer>(mut self, dialer: D) -> Self {
        self.dialer = Some(Arc::new(dialer));
        self
    }

    /// Accept any certificate on the TLS attempt. Only for tests against
    /// self-signed servers.
    #[must_use]
    pub fn insecure_tls(mut self) -> Self {
        self.insecure_tls = true;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn upgrade_timeout(mut self, timeout: Duration) -> Self {
        self.config.upgrade_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn config(mut self, config: DialConfig) -> Self {
        self.config = config;
        self
    }

    /// Abort the dial when `token` is canceled.
    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validates everything and prepares a dialer, without touching the network.
    pub fn build<P: HandshakeProtocol>(
        self,
        protocol: P,
        machine_key: P::PrivateKey,
        control_key: P::PublicKey,
    ) -> Result<ClientDialer<P>> {
        let mut params = DialParams::<P>::new(&self.addr, machine_key, control_key)?;
        if let Some(port) = self.https_port {
            params.https_port = port;
        }
        if let Some(proxy) = self.proxy {
            params.proxy = proxy;
        }
        params.dialer = self.dialer;
        params.insecure_tls = self.insecure_tls;
        params.config = self.config;

        ClientDialer::new(protocol, params)
    }

    /// Dials and runs the inner handshake.
    pub async fn connect<P: HandshakeProtocol>(
        self,
        protocol: P,
        machine_key: P::PrivateKey,
        control_key: P::PublicKey,
    ) -> Result<P::Channel> {
        let cancel = self.cancel.clone().unwrap_or_default();
        tracing::debug!(addr = %self.addr, "connecting");
        let dialer = self.build(protocol, machine_key, control_key)?;
        dialer.dial_with_cancel(&cancel).await
    }
}

impl fmt::Debug for DialBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialBuilder")
            .field("addr", &self.addr)
            .field("https_port", &self.https_port)
            .field("insecure_tls", &self.insecure_tls)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
