use crate::core::{ThreadId, Ticks};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Arrived {
        thread: ThreadId,
    },
    IoCompleted {
        thread: ThreadId,
    },
    IoBlocked {
        thread: ThreadId,
        duration: Ticks,
    },
    // Quantum expired, thread handed back to the scheduler
    Preempted {
        thread: ThreadId,
    },
    Terminated {
        thread: ThreadId,
    },
    Dispatched {
        from: Option<ThreadId>,
        to: ThreadId,
        context_switch: bool,
    },
    // Nothing running even after pick_next()
    CpuIdle,
}
