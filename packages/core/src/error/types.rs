use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;

/// A Result alias where the Err case is `switchover_core::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur while switching an HTTP connection to the
/// tunnel protocol, on either side.
pub struct Error {
    pub inner: Box<Inner>,
}

pub struct Inner {
    pub kind: Kind,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub url: Option<url::Url>,
    /// Status code observed by the client, or written by the server.
    pub status: Option<StatusCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Invalid parameters or configuration, detected before any I/O.
    Builder,
    /// DNS, dial, proxy or TLS failure before an HTTP response arrived.
    Transport,
    /// Unexpected status or `Upgrade` header.
    Negotiation,
    /// The HTTP layer did not behave as the upgrade machinery requires.
    Integration,
    /// The inner handshake failed over an established raw connection.
    Handshake,
    /// Read, write or flush failure on a hijacked connection.
    Io,
    /// The caller canceled the dial.
    Canceled,
    /// Both the cleartext and the TLS attempts failed.
    Exhausted,
}

impl Error {
    pub fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                url: None,
                status: None,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub fn with<E: Into<Box<dyn StdError + Send + Sync>>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: url::Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.inner.status = Some(status);
        self
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Get the URL of the attempt this error belongs to, if any
    #[must_use]
    pub fn url(&self) -> Option<&url::Url> {
        self.inner.url.as_ref()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("switchover::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref url) = self.inner.url {
            f.field("url", url);
        }

        if let Some(status) = self.inner.status {
            f.field("status", &status);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.inner.kind {
            Kind::Builder => "invalid dial or accept parameters",
            Kind::Transport => "transport error",
            Kind::Negotiation => "protocol switch negotiation failed",
            Kind::Integration => "HTTP layer integration error",
            Kind::Handshake => "inner handshake failed",
            Kind::Io => "I/O error on switched connection",
            Kind::Canceled => "operation canceled",
            Kind::Exhausted => "all connection attempts failed",
        };
        f.write_str(prefix)?;

        if let Some(ref url) = self.inner.url {
            write!(f, " ({url})")?;
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
