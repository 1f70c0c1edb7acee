//! Server half of the protocol switch

pub mod accept;
pub mod serve;
pub mod sink;

pub use accept::accept;
pub use serve::Server;
pub use sink::{Hijack, PendingResponse, ResponseSink, error_response};
