//! Error types produced by the configuration engine.

mod aggregate;
mod constructors;
mod conversions;
mod types;

pub use aggregate::AggregatedErrors;
pub use types::MainspringError;

#[cfg(test)]
mod tests;
