use thiserror::Error;

use crate::core::ThreadId;

/// Errors raised while configuring a simulation, before any tick runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown scheduler policy: {0}")]
    UnknownPolicy(String),

    #[error("Unknown workload: {0}")]
    UnknownWorkload(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Unknown benchmark: {0}")]
    UnknownBenchmark(String),

    #[error("Duplicate thread id: {0}")]
    DuplicateThreadId(ThreadId),

    #[error("Thread {id} has nice {nice}, expected -20..=19")]
    NiceOutOfRange { id: ThreadId, nice: i32 },

    // A thread with no work would hold the CPU for a tick without progress
    #[error("Thread {0} has a burst time of zero")]
    ZeroBurst(ThreadId),

    #[error("Time slice must be at least one tick")]
    ZeroTimeSlice,
}
