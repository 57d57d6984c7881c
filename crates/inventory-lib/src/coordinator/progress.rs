//! Progress reporting seam

/// Receives a tick each time a unit reaches a terminal state
pub trait ProgressReporter: Send + Sync {
    /// Called at the start with the number of units the run covers
    fn start(&self, _total: usize) {}

    /// `done` units out of `total` have succeeded, failed or been skipped
    fn advance(&self, done: usize, total: usize);

    fn finish(&self) {}
}

/// Reporter that discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn advance(&self, _done: usize, _total: usize) {}
}
