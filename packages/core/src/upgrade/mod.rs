//! HTTP/1.1 protocol switch primitives
//!
//! The wire contract shared by both peers, plus the two pieces that move a raw
//! connection out of the HTTP machinery intact: the residue-draining
//! connection and the one-shot connection extractor.

pub mod drain;
pub mod extract;

pub use drain::{BufferedDrainConn, SwitchedConn};
pub use extract::{ConnectionExtractor, ConnectionSignal};

/// Value of the `Upgrade` header naming the tunnel protocol, in both the
/// request and the 101 response.
pub const UPGRADE_PROTOCOL: &str = "switchover-control-protocol";

/// Path of the switch endpoint.
pub const SWITCH_PATH: &str = "/switch";

/// Port of the TLS fallback attempt.
pub const DEFAULT_HTTPS_PORT: u16 = 443;
