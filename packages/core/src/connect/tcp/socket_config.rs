//! TCP socket configuration utilities

use std::io;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

use crate::config::TcpConfig;

/// Applies `TCP_NODELAY` and keepalive to a connected socket.
pub fn configure_tcp_socket(stream: &TcpStream, config: &TcpConfig) -> io::Result<()> {
    if config.nodelay {
        stream.set_nodelay(true)?;
    }

    if let Some(idle) = config.keepalive {
        let keepalive = TcpKeepalive::new().with_time(idle);
        SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
    }

    Ok(())
}
