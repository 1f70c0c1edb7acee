//! Fluent builders for both ends of a switchover tunnel

pub mod dial;
pub mod server;

pub use dial::DialBuilder;
pub use server::ServerBuilder;
