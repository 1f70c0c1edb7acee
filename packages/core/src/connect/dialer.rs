//! Pluggable dialing

use std::io;

use futures::future::BoxFuture;

use super::tls::TlsDialer;
use super::types::BoxedIo;

/// Opens the byte streams an attempt runs over.
///
/// `dial` is used for cleartext targets and proxies; `dial_tls` for the TLS
/// fallback target and `https` proxies. The default `dial_tls` dials and then
/// runs the TLS handshake, so most implementations only provide `dial`.
pub trait Dialer: Send + Sync + 'static {
    fn dial<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, io::Result<BoxedIo>>;

    fn dial_tls<'a>(
        &'a self,
        host: &'a str,
        port: u16,
        tls: &'a TlsDialer,
    ) -> BoxFuture<'a, io::Result<BoxedIo>> {
        Box::pin(async move {
            let io = self.dial(host, port).await?;
            tls.handshake(host, io).await
        })
    }
}
