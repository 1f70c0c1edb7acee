//! One upgrade attempt against one URL

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONNECTION, HOST, PROXY_AUTHORIZATION, UPGRADE};
use http::{HeaderValue, Method, Request, StatusCode, Uri};
use http_body_util::Full;
use url::{Host, Url};

use super::transport::SingleUseTransport;
use crate::config::DialConfig;
use crate::connect::{BoxedIo, Dialer, TlsDialer, establish_connect_tunnel, proxy_authorization};
use crate::error::{self, NegotiationFailure, Result, TimedOut};
use crate::proxy::ProxyResolver;
use crate::upgrade::{SWITCH_PATH, SwitchedConn, UPGRADE_PROTOCOL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one attempt goes. Built once per attempt and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptTarget {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl AttemptTarget {
    /// `host` is a bare name or address, IPv6 literals without brackets.
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn url(&self) -> Result<Url> {
        let raw = format!("{}://{}{}", self.scheme, self.authority(), SWITCH_PATH);
        Url::parse(&raw).map_err(error::builder)
    }
}

/// Everything an attempt needs besides its target. Shared by both attempts
/// of a dial.
#[derive(Clone)]
pub struct AttemptContext {
    pub proxy: Arc<dyn ProxyResolver>,
    pub dialer: Arc<dyn Dialer>,
    pub tls: TlsDialer,
    pub config: DialConfig,
}

impl fmt::Debug for AttemptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptContext")
            .field("tls", &self.tls)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The stream an upgrade request is written to, and how to address it.
struct Route {
    io: BoxedIo,
    uri: Uri,
    proxy_authorization: Option<HeaderValue>,
}

/// A single `POST /switch` exchange over a fresh single-use transport.
#[derive(Debug)]
pub struct ClientAttempt<'a> {
    context: &'a AttemptContext,
    target: AttemptTarget,
}

impl<'a> ClientAttempt<'a> {
    pub fn new(context: &'a AttemptContext, target: AttemptTarget) -> Self {
        Self { context, target }
    }

    /// Sends `init` as the upgrade request body and returns the raw
    /// connection once the server switched protocols.
    #[tracing::instrument(
        name = "attempt",
        skip_all,
        fields(scheme = %self.target.scheme, host = %self.target.host, port = self.target.port)
    )]
    pub async fn run(self, init: Bytes) -> Result<SwitchedConn> {
        let url = self.target.url()?;
        match self.switch(&url, init).await {
            Ok(conn) => {
                tracing::debug!(buffered = conn.is_buffered(), "protocol switched");
                Ok(conn)
            }
            Err(e) => {
                tracing::debug!("attempt failed: {e}");
                Err(e.with_url(url))
            }
        }
    }

    async fn switch(&self, url: &Url, init: Bytes) -> Result<SwitchedConn> {
        let config = &self.context.config;
        let route = self.route(url).await?;

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(route.uri)
            .header(HOST, self.target.authority())
            .header(UPGRADE, UPGRADE_PROTOCOL)
            .header(CONNECTION, "upgrade");
        if let Some(auth) = route.proxy_authorization {
            request = request.header(PROXY_AUTHORIZATION, auth);
        }
        let request = request.body(Full::new(init)).map_err(error::builder)?;

        let transport = SingleUseTransport::handshake(route.io).await?;
        let exchange = transport.round_trip(request);
        let mut round_trip = match config.upgrade_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| error::transport(TimedOut))??,
            None => exchange.await?,
        };

        let status = round_trip.status();
        if status != StatusCode::SWITCHING_PROTOCOLS {
            let body = round_trip.read_body(config.max_error_body).await;
            return Err(
                error::negotiation(NegotiationFailure::UnexpectedStatus { status, body })
                    .with_status(status),
            );
        }

        let next = round_trip
            .headers()
            .get(UPGRADE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();

        // From here the connection is ours, and dropping it closes it.
        let conn = round_trip.into_connection().await?;

        if next != UPGRADE_PROTOCOL {
            drop(conn);
            return Err(
                error::negotiation(NegotiationFailure::UnexpectedProtocol(next)).with_status(status),
            );
        }

        Ok(conn)
    }

    async fn route(&self, url: &Url) -> Result<Route> {
        let proxy = self
            .context
            .proxy
            .proxy_for(url)
            .map_err(error::transport)?;

        match proxy {
            None => Ok(Route {
                io: self.connect_direct().await?,
                uri: Uri::from_static(SWITCH_PATH),
                proxy_authorization: None,
            }),
            Some(proxy) => self.connect_via(url, &proxy).await,
        }
    }

    async fn connect_direct(&self) -> Result<BoxedIo> {
        let AttemptContext { dialer, tls, .. } = self.context;
        let (host, port) = (self.target.host.as_str(), self.target.port);

        let io = match self.target.scheme {
            Scheme::Http => dialer.dial(host, port).await,
            Scheme::Https => dialer.dial_tls(host, port, tls).await,
        };
        io.map_err(error::transport)
    }

    async fn connect_via(&self, url: &Url, proxy: &Url) -> Result<Route> {
        let AttemptContext { dialer, tls, .. } = self.context;
        let proxy_host = url_host(proxy)
            .ok_or_else(|| error::transport(format!("proxy URL {proxy} has no host")))?;
        let proxy_port = proxy
            .port_or_known_default()
            .ok_or_else(|| error::transport(format!("proxy URL {proxy} has no port")))?;

        tracing::debug!(proxy = %proxy_host, proxy_port, "dialing through proxy");
        let io = match proxy.scheme() {
            "http" => dialer.dial(&proxy_host, proxy_port).await,
            "https" => dialer.dial_tls(&proxy_host, proxy_port, tls).await,
            other => {
                return Err(error::transport(format!("unsupported proxy scheme {other:?}")));
            }
        }
        .map_err(error::transport)?;

        match self.target.scheme {
            // The proxy forwards the request itself, so it gets the full URL.
            Scheme::Http => Ok(Route {
                io,
                uri: url.as_str().parse::<Uri>().map_err(error::builder)?,
                proxy_authorization: proxy_authorization(proxy),
            }),
            Scheme::Https => {
                let tunnel = establish_connect_tunnel(io, &self.target.authority(), proxy).await?;
                let io = tls
                    .handshake(&self.target.host, Box::new(tunnel))
                    .await
                    .map_err(error::transport)?;
                Ok(Route {
                    io,
                    uri: Uri::from_static(SWITCH_PATH),
                    proxy_authorization: None,
                })
            }
        }
    }
}

/// Host of a URL in the form dialers expect: no brackets around IPv6.
fn url_host(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_urls() {
        let http = AttemptTarget::new(Scheme::Http, "control.example", 8080);
        assert_eq!(http.url().unwrap().as_str(), "http://control.example:8080/switch");

        let https = AttemptTarget::new(Scheme::Https, "::1", 443);
        assert_eq!(https.authority(), "[::1]:443");
        // The default port is elided by the URL but kept in the authority.
        assert_eq!(https.url().unwrap().as_str(), "https://[::1]/switch");
    }

    #[test]
    fn proxy_host_without_brackets() {
        let proxy = Url::parse("http://[fd7a::1]:3128").unwrap();
        assert_eq!(url_host(&proxy).as_deref(), Some("fd7a::1"));
    }
}
