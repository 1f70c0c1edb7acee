pub mod classification;
pub mod constructors;
pub mod helpers;
pub mod types;

pub use constructors::*;
pub use helpers::{AttemptsFailed, IntegrationFailure, NegotiationFailure, OperationCanceled, TimedOut};
pub use types::{Error, Inner, Kind, Result};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
