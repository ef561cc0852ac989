//! Cadence Config
//!
//! This crate contains the plain value types shared by every cadence crate.
//! They carry no behavior beyond small predicates and are serializable so they
//! can cross the dispatch and persistence boundary unchanged.
//!
//! - [`Arguments`] / [`Options`]: the argument list captured by a builder and
//!   handed to steps, iterators and jobs.
//! - [`CompletionPolicy`]: the join rule of a concurrent process.
//! - [`RuntimeConfig`]: settings for the execution driver.

mod arguments;
mod options;
mod policy;
mod runtime;

pub use arguments::Arguments;
pub use options::Options;
pub use policy::CompletionPolicy;
pub use runtime::RuntimeConfig;

/// A single argument value.
pub type Value = serde_json::Value;
