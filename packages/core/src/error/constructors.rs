use super::BoxError;
use super::helpers::{AttemptsFailed, IntegrationFailure, OperationCanceled};
use super::types::{Error, Kind};

/// Creates an `Error` for invalid parameters or configuration.
pub fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder).with(e.into())
}

/// Creates an `Error` for a dial, proxy or TLS failure.
pub fn transport<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Transport).with(e.into())
}

/// Creates an `Error` for a refused or mismatched protocol switch.
pub fn negotiation<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Negotiation).with(e.into())
}

/// Creates an `Error` for an HTTP layer that broke the upgrade contract.
pub fn integration(e: IntegrationFailure) -> Error {
    Error::new(Kind::Integration).with(e)
}

/// Creates an `Error` for an inner handshake failure.
pub fn handshake<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Handshake).with(e.into())
}

/// Creates an `Error` for I/O on a hijacked or extracted connection.
pub fn io<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Io).with(e.into())
}

pub fn canceled() -> Error {
    Error::new(Kind::Canceled).with(OperationCanceled)
}

/// Creates the combined error returned when both attempts failed.
pub fn exhausted(http: Error, https: Error) -> Error {
    Error::new(Kind::Exhausted).with(AttemptsFailed { http, https })
}
