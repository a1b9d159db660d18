pub mod cfs;
pub mod mlfqs;
pub mod priority;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::{
    core::{ThreadKey, ThreadTable, Ticks},
    error::ConfigError,
};
pub use cfs::WeightedFair;
pub use mlfqs::FeedbackQueue;
pub use priority::StaticPriority;

/// Contract between the tick engine and a scheduling policy. Policies hold
/// keys into the engine's [`ThreadTable`], never the threads themselves.
pub trait Scheduler {
    fn name(&self) -> &'static str;

    /// Admit a thread that just became Ready (arrival or I/O completion).
    fn add_thread(&mut self, threads: &mut ThreadTable, thread: ThreadKey);

    // Called once per tick before the running thread advances
    fn tick(&mut self, threads: &mut ThreadTable, now: Ticks, running: Option<ThreadKey>);

    /// Remove the next thread to run from the ready structure and mark it
    /// Running.
    fn pick_next(&mut self, threads: &mut ThreadTable) -> Option<ThreadKey>;

    /// Re-admit a thread whose quantum expired.
    fn thread_yield(&mut self, threads: &mut ThreadTable, thread: ThreadKey);

    fn thread_exit(&mut self, threads: &mut ThreadTable, thread: ThreadKey);

    fn ready_len(&self) -> usize;

    fn is_queued(&self, thread: ThreadKey) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PolicyKind {
    StaticPriority,
    FeedbackQueue,
    WeightedFair,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [
        PolicyKind::StaticPriority,
        PolicyKind::FeedbackQueue,
        PolicyKind::WeightedFair,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::StaticPriority => "basic",
            PolicyKind::FeedbackQueue => "mlfqs",
            PolicyKind::WeightedFair => "cfs",
        }
    }

    pub fn build(self) -> AnyScheduler {
        match self {
            PolicyKind::StaticPriority => AnyScheduler::StaticPriority(StaticPriority::new()),
            PolicyKind::FeedbackQueue => AnyScheduler::FeedbackQueue(FeedbackQueue::new()),
            PolicyKind::WeightedFair => AnyScheduler::WeightedFair(WeightedFair::new()),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" | "priority" | "static" => Ok(PolicyKind::StaticPriority),
            "mlfqs" | "mlfq" | "feedback" => Ok(PolicyKind::FeedbackQueue),
            "cfs" | "fair" => Ok(PolicyKind::WeightedFair),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Closed set of the three policies, dispatched by match.
#[derive(Debug)]
pub enum AnyScheduler {
    StaticPriority(StaticPriority),
    FeedbackQueue(FeedbackQueue),
    WeightedFair(WeightedFair),
}

impl AnyScheduler {
    pub fn kind(&self) -> PolicyKind {
        match self {
            AnyScheduler::StaticPriority(_) => PolicyKind::StaticPriority,
            AnyScheduler::FeedbackQueue(_) => PolicyKind::FeedbackQueue,
            AnyScheduler::WeightedFair(_) => PolicyKind::WeightedFair,
        }
    }
}

impl From<StaticPriority> for AnyScheduler {
    fn from(s: StaticPriority) -> Self {
        AnyScheduler::StaticPriority(s)
    }
}

impl From<FeedbackQueue> for AnyScheduler {
    fn from(s: FeedbackQueue) -> Self {
        AnyScheduler::FeedbackQueue(s)
    }
}

impl From<WeightedFair> for AnyScheduler {
    fn from(s: WeightedFair) -> Self {
        AnyScheduler::WeightedFair(s)
    }
}

macro_rules! dispatch {
    ($self:ident, $s:ident => $body:expr) => {
        match $self {
            AnyScheduler::StaticPriority($s) => $body,
            AnyScheduler::FeedbackQueue($s) => $body,
            AnyScheduler::WeightedFair($s) => $body,
        }
    };
}

impl Scheduler for AnyScheduler {
    fn name(&self) -> &'static str {
        dispatch!(self, s => s.name())
    }

    fn add_thread(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        dispatch!(self, s => s.add_thread(threads, thread))
    }

    fn tick(&mut self, threads: &mut ThreadTable, now: Ticks, running: Option<ThreadKey>) {
        dispatch!(self, s => s.tick(threads, now, running))
    }

    fn pick_next(&mut self, threads: &mut ThreadTable) -> Option<ThreadKey> {
        dispatch!(self, s => s.pick_next(threads))
    }

    fn thread_yield(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        dispatch!(self, s => s.thread_yield(threads, thread))
    }

    fn thread_exit(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        dispatch!(self, s => s.thread_exit(threads, thread))
    }

    fn ready_len(&self) -> usize {
        dispatch!(self, s => s.ready_len())
    }

    fn is_queued(&self, thread: ThreadKey) -> bool {
        dispatch!(self, s => s.is_queued(thread))
    }
}
