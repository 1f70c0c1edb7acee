//! Type-erased connection

use tokio::io::{AsyncRead, AsyncWrite};

/// Anything usable as the byte stream under an upgrade.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub type BoxedIo = Box<dyn Io>;
