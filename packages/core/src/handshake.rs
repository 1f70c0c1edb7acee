//! The inner handshake run over a switched connection
//!
//! The tunnel protocol itself (key exchange, framing, encryption) is not part
//! of this crate. Callers plug it in through [`HandshakeProtocol`]: the client
//! side prepares an initiation payload that travels as the body of the
//! upgrade request, and finishes the handshake over the raw connection once
//! the switch succeeded; the server side gets the payload and the connection
//! together.

use std::future::Future;

use bytes::Bytes;

use crate::error::BoxError;
use crate::upgrade::SwitchedConn;

/// A tunnel protocol that can be bootstrapped over an HTTP upgrade.
pub trait HandshakeProtocol: Send + Sync + 'static {
    /// Our own long-term identity.
    type PrivateKey: Send + Sync;
    /// The identity we expect the peer to prove.
    type PublicKey: Send + Sync;
    /// The established secure channel.
    type Channel: Send + 'static;
    /// Client state between sending the initiation and reading the answer.
    type Continuation: ClientContinuation<Channel = Self::Channel>;

    /// Builds a fresh initiation payload. Called once per attempt; a payload
    /// is never sent twice.
    fn client_initiation(
        &self,
        private: &Self::PrivateKey,
        peer: &Self::PublicKey,
    ) -> Result<(Bytes, Self::Continuation), BoxError>;

    /// Completes the server side of the handshake.
    fn server_handshake(
        &self,
        conn: SwitchedConn,
        private: &Self::PrivateKey,
        init: Bytes,
    ) -> impl Future<Output = Result<Self::Channel, BoxError>> + Send;
}

/// The client half of a handshake that has sent its initiation.
pub trait ClientContinuation: Send + 'static {
    type Channel;

    fn complete(
        self,
        conn: SwitchedConn,
    ) -> impl Future<Output = Result<Self::Channel, BoxError>> + Send;
}
