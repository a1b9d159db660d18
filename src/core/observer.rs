use super::state::{ThreadKey, ThreadStatus, ThreadTable};
use crate::scheduler::Scheduler;

/// Checks engine invariants once per tick and counts CPU occupancy.
#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
    busy_ticks: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe<S: Scheduler>(
        &mut self,
        threads: &ThreadTable,
        scheduler: &S,
        running: Option<ThreadKey>,
    ) {
        self.step += 1;
        if running.is_some() {
            self.busy_ticks += 1;
        }

        if let Some(key) = running {
            let thread = threads.get(key);
            debug_assert_eq!(
                thread.status,
                ThreadStatus::Running,
                "cpu.current thread {} must be Running",
                thread.id
            );
            debug_assert!(
                !scheduler.is_queued(key),
                "Running thread {} must not appear in the ready structure",
                thread.id
            );
        }

        let mut running_count = 0;
        let mut ready_count = 0;
        for (_, thread) in threads.iter() {
            match thread.status {
                ThreadStatus::Running => running_count += 1,
                ThreadStatus::Ready => ready_count += 1,
                ThreadStatus::Terminated => {
                    debug_assert_eq!(
                        thread.remaining_time, 0,
                        "Terminated thread {} has work left",
                        thread.id
                    );
                    debug_assert!(thread.finish_time.is_some());
                }
                ThreadStatus::Blocked => {}
            }
        }

        debug_assert!(running_count <= 1, "{running_count} threads Running at once");
        debug_assert_eq!(running_count, usize::from(running.is_some()));
        debug_assert_eq!(
            ready_count,
            scheduler.ready_len(),
            "Ready threads and the scheduler's ready structure disagree"
        );
    }

    pub fn busy_ticks(&self) -> u64 {
        self.busy_ticks
    }

    pub fn idle_ticks(&self) -> u64 {
        self.step - self.busy_ticks
    }
}
