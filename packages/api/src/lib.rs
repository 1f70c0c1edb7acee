//! Switchover public API
//!
//! Secure tunnels bootstrapped over an HTTP/1.1 protocol switch. Clients try
//! cleartext HTTP first and fall back to HTTPS on port 443; servers host the
//! `/switch` endpoint and hand out established channels.
//!
//! ```no_run
//! # async fn run<P: switchover::HandshakeProtocol>(
//! #     protocol: P,
//! #     machine_key: P::PrivateKey,
//! #     control_key: P::PublicKey,
//! # ) -> switchover::Result<()> {
//! let channel = switchover::Switchover::dial("control.example:80")
//!     .connect(protocol, machine_key, control_key)
//!     .await?;
//! # let _ = channel;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod builder;

pub use builder::*;

pub use switchover_core::{
    AcceptConfig, BoxError, ClientContinuation, DialConfig, Dialer, Direct, EnvProxy, Error,
    HandshakeProtocol, Kind, NoProxy, ProxyResolver, Result, Server, SwitchedConn, TcpConfig,
    UPGRADE_PROTOCOL,
};
pub use switchover_core::client::ClientDialer;

pub use bytes::Bytes;

/// Entry point providing the builders.
pub struct Switchover;

impl Switchover {
    /// Starts a client for the server at `addr` (`host:port`).
    pub fn dial(addr: impl Into<String>) -> DialBuilder {
        DialBuilder::new(addr)
    }

    /// Starts a hosting server for `protocol`.
    pub fn server<P: HandshakeProtocol>(protocol: P, private: P::PrivateKey) -> ServerBuilder<P> {
        ServerBuilder::new(protocol, private)
    }
}
