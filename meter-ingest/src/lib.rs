pub mod aggregate;
pub mod clock;
pub mod config;
pub mod filter;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod sinks;
pub mod sources;

#[cfg(test)]
mod testing;

pub use pipeline::{Envelope, Pipeline};
