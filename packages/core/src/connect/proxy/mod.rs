//! Tunneling through HTTP proxies

pub mod http_connect;

pub use http_connect::{establish_connect_tunnel, proxy_authorization};
