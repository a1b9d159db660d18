use std::sync::Arc;

use serde::Serialize;

use crate::core::{Nice, Thread, ThreadId, ThreadStatus, Ticks};

/// State of one arrived thread at the end of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub tick: Ticks,
    pub id: ThreadId,
    pub name: Arc<str>,
    pub status: ThreadStatus,
    pub priority: Option<u8>,
    pub nice: Nice,
    pub vruntime: u64,
    pub remaining_time: Ticks,
    pub wait_time: Ticks,
}

impl Snapshot {
    pub fn of(tick: Ticks, thread: &Thread) -> Self {
        Self {
            tick,
            id: thread.id,
            name: Arc::clone(&thread.name),
            status: thread.status,
            priority: thread.priority,
            nice: thread.nice,
            vruntime: thread.vruntime,
            remaining_time: thread.remaining_time,
            wait_time: thread.wait_time,
        }
    }
}

/// Everything a finished run hands to the metrics and presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct SimOutcome {
    pub policy: &'static str,
    /// Final thread records, in input order.
    pub threads: Vec<Thread>,
    pub history: Vec<Snapshot>,
    pub context_switches: u64,
    /// Ticks simulated, including the last one.
    pub ticks: Ticks,
    /// Ticks in which some thread held the CPU.
    pub busy_ticks: u64,
}

impl SimOutcome {
    pub fn finished(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter().filter(|t| t.finish_time.is_some())
    }

    pub fn all_finished(&self) -> bool {
        self.threads.iter().all(Thread::is_finished)
    }

    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    /// Snapshots of one thread, in tick order.
    pub fn trace_of(&self, id: ThreadId) -> impl Iterator<Item = &Snapshot> {
        self.history.iter().filter(move |s| s.id == id)
    }

    /// Ticks in which `id` held the CPU, according to the trace.
    pub fn running_ticks(&self, id: ThreadId) -> usize {
        self.trace_of(id)
            .filter(|s| s.status == ThreadStatus::Running)
            .count()
    }
}
