//! Connection establishment for dial attempts
//!
//! Byte streams are handed around as [`BoxedIo`] so that plain TCP, TLS over
//! TCP and TLS inside a proxy tunnel look the same to the HTTP layer.

pub mod dialer;
pub mod proxy;
pub mod tcp;
pub mod tls;
pub mod types;

pub use dialer::Dialer;
pub use proxy::{establish_connect_tunnel, proxy_authorization};
pub use tcp::{TcpDialer, configure_tcp_socket};
pub use tls::TlsDialer;
pub use types::{BoxedIo, Io};
