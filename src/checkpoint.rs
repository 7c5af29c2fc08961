//! The resume point of an invocation.

use std::fmt::{self, Display};

/// The highest run ID visited so far.
///
/// Starts at the lower bound the invocation was given and only ever grows, so printing it on exit and feeding it back
/// as the next lower bound never reprocesses a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Checkpoint(u64);

impl Checkpoint {
    /// Creates a [`Checkpoint`] starting at `run_id`.
    pub const fn new(run_id: u64) -> Self {
        Self(run_id)
    }

    /// Moves the checkpoint to `run_id` if it is newer. Returns whether the checkpoint moved.
    pub fn advance(&mut self, run_id: u64) -> bool {
        if run_id > self.0 {
            self.0 = run_id;
            true
        } else {
            false
        }
    }

    /// The current run ID.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
