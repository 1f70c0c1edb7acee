//! # Switchover core
//!
//! Bootstraps a secure tunnel over an HTTP/1.1 protocol switch, so that it
//! gets through proxies and inspecting firewalls that only pass HTTP.
//!
//! The client POSTs the first message of the inner handshake to `/switch`
//! with `Upgrade: switchover-control-protocol`. The server answers `101
//! Switching Protocols`, both sides take the raw connection away from their
//! HTTP layer, and the inner handshake continues over it. If the cleartext
//! attempt is blocked, the client retries the same exchange over HTTPS on
//! port 443.
//!
//! The inner protocol is supplied by the caller through
//! [`HandshakeProtocol`]; this crate only moves its bytes.
//!
//! ## Features
//!
//! - **Zero-loss hand-off**: bytes the HTTP layer read ahead are replayed
//!   before the socket ([`upgrade::BufferedDrainConn`])
//! - **Cleartext first, TLS fallback** with a combined error when both fail
//! - **Proxy aware**: `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY`, `CONNECT` tunnels
//! - **Pluggable dialing** through [`connect::Dialer`]
//! - **Hosting server** for the endpoint, plain or behind TLS

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod connect;
pub mod error;
pub mod handshake;
pub mod proxy;
pub mod server;
pub mod upgrade;

pub use client::{ClientDialer, DialParams, dial};
pub use config::{AcceptConfig, DialConfig, TcpConfig};
pub use connect::{BoxedIo, Dialer, TcpDialer, TlsDialer};
pub use error::{BoxError, Error, Kind, Result};
pub use handshake::{ClientContinuation, HandshakeProtocol};
pub use proxy::{Direct, EnvProxy, NoProxy, ProxyResolver};
pub use server::{ResponseSink, Server, accept};
pub use upgrade::{SWITCH_PATH, SwitchedConn, UPGRADE_PROTOCOL};
