//! Retrieves GitHub Actions artifacts across workflow runs.
//!
//! Runs are enumerated newest first down to a lower-bound run ID, the artifacts of each run are filtered by name and
//! expiry, and the selected ones are downloaded and optionally unpacked into `<output>/<run ID>/`. The highest run ID
//! visited is tracked as a [`Checkpoint`] so a later invocation can resume from it.
//!
//! See: [`pipeline::run`]

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
mod fs;
pub mod pipeline;
pub mod shutdown;
pub mod transactions;
pub mod workflow;

pub use checkpoint::Checkpoint;
pub use config::{Config, Mode};
pub use error::{Error, Result};
