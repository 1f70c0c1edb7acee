use std::error::Error as StdError;
use std::io;

use bytes::Bytes;
use http::StatusCode;

use super::helpers::{AttemptsFailed, NegotiationFailure, TimedOut};
use super::types::{Error, Kind};

impl Error {
    /// Returns true if the error came from invalid parameters or configuration.
    #[must_use]
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error happened before an HTTP response was received.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self.inner.kind, Kind::Transport)
    }

    /// Returns true if the peer refused or mismatched the protocol switch.
    #[must_use]
    pub fn is_negotiation(&self) -> bool {
        matches!(self.inner.kind, Kind::Negotiation)
    }

    #[must_use]
    pub fn is_integration(&self) -> bool {
        matches!(self.inner.kind, Kind::Integration)
    }

    #[must_use]
    pub fn is_handshake(&self) -> bool {
        matches!(self.inner.kind, Kind::Handshake)
    }

    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self.inner.kind, Kind::Io)
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self.inner.kind, Kind::Canceled)
    }

    /// Returns true if both the cleartext and TLS attempts failed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self.inner.kind, Kind::Exhausted)
    }

    /// Returns true if a client attempt failing with this error may be
    /// retried over the TLS fallback.
    #[must_use]
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self.inner.kind, Kind::Transport | Kind::Negotiation)
    }

    /// Returns true if the error is related to a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if err.is::<TimedOut>() {
                return true;
            }
            if let Some(hyper_err) = err.downcast_ref::<hyper::Error>()
                && hyper_err.is_timeout()
            {
                return true;
            }
            if let Some(io) = err.downcast_ref::<io::Error>()
                && io.kind() == io::ErrorKind::TimedOut
            {
                return true;
            }
            source = err.source();
        }

        false
    }

    /// Returns the status code received by the client, or the one the server wrote.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.inner.status
    }

    /// The body of a non-101 response, kept for diagnostics.
    #[must_use]
    pub fn response_body(&self) -> Option<&Bytes> {
        match self.source()?.downcast_ref::<NegotiationFailure>()? {
            NegotiationFailure::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The cleartext and TLS attempt errors of an exhausted dial.
    #[must_use]
    pub fn attempts(&self) -> Option<(&Error, &Error)> {
        let failed = self.source()?.downcast_ref::<AttemptsFailed>()?;
        Some((&failed.http, &failed.https))
    }
}
