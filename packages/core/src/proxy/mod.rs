//! Proxy resolution for dial attempts
//!
//! The transport asks a [`ProxyResolver`] once per attempt, with the full
//! attempt URL, which proxy (if any) to go through. Only `http://` and
//! `https://` proxy URLs are understood by the transport.

pub mod env;
pub mod no_proxy;

use url::Url;

use crate::error::BoxError;

pub use env::{EnvProxy, parse_proxy_url};
pub use no_proxy::NoProxy;

/// Chooses the proxy for a request URL; `Ok(None)` means connect directly.
pub trait ProxyResolver: Send + Sync + 'static {
    fn proxy_for(&self, target: &Url) -> Result<Option<Url>, BoxError>;
}

impl<F> ProxyResolver for F
where
    F: Fn(&Url) -> Result<Option<Url>, BoxError> + Send + Sync + 'static,
{
    fn proxy_for(&self, target: &Url) -> Result<Option<Url>, BoxError> {
        self(target)
    }
}

/// Never uses a proxy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

impl ProxyResolver for Direct {
    fn proxy_for(&self, _target: &Url) -> Result<Option<Url>, BoxError> {
        Ok(None)
    }
}
