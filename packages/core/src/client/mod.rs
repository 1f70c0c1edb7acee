//! Client half of the protocol switch

pub mod attempt;
pub mod dial;
pub mod transport;

pub use attempt::{AttemptContext, AttemptTarget, ClientAttempt, Scheme};
pub use dial::{ClientDialer, DialParams, dial, split_host_port};
pub use transport::{RoundTrip, SingleUseTransport};
