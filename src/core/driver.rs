use super::{
    event::SimEvent,
    observer::Observer,
    state::{ThreadId, ThreadKey, ThreadStatus, ThreadTable, Ticks},
};
use crate::{config::clamp_io_duration, scheduler::Scheduler};

/// Single-CPU tick engine. Owns the threads of one run and the policy that
/// orders them.
pub struct SchedCore<S: Scheduler> {
    pub threads: ThreadTable,
    pub scheduler: S,
    now: Ticks,
    running: Option<ThreadKey>,
    // Last thread that held the CPU, for context-switch accounting
    prev_running: Option<ThreadId>,
    time_slice: u32,
    slice_remaining: u32,
    context_switches: u64,
    observer: Observer,
}

impl<S: Scheduler> SchedCore<S> {
    pub fn new(scheduler: S, threads: ThreadTable, time_slice: u32) -> Self {
        Self {
            threads,
            scheduler,
            now: 0,
            running: None,
            prev_running: None,
            time_slice,
            slice_remaining: 0,
            context_switches: 0,
            observer: Observer::new(),
        }
    }

    /// Hand a newly arrived thread to the scheduler.
    pub fn admit(&mut self, key: ThreadKey) -> SimEvent {
        self.threads.mark_ready(key);
        self.scheduler.add_thread(&mut self.threads, key);
        SimEvent::Arrived {
            thread: self.threads.get(key).id,
        }
    }

    /// One tick of simulated time, minus arrivals and tracing: release
    /// finished I/O, run policy bookkeeping, advance the running thread,
    /// dispatch if the CPU is free, and account wait time.
    pub fn tick(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();

        self.complete_io(&mut events);
        self.scheduler
            .tick(&mut self.threads, self.now, self.running);
        self.run_current(&mut events);

        if self.running.is_none() {
            self.dispatch(&mut events);
        }

        self.account_waiting();
        self.observer
            .observe(&self.threads, &self.scheduler, self.running);
        events
    }

    fn complete_io(&mut self, events: &mut Vec<SimEvent>) {
        for index in 0..self.threads.len() {
            let key = self.threads.keys()[index];
            let thread = self.threads.get_mut(key);
            if thread.status != ThreadStatus::Blocked || thread.io_remaining == 0 {
                continue;
            }

            thread.io_remaining -= 1;
            if thread.io_remaining == 0 {
                let id = thread.id;
                self.threads.mark_ready(key);
                self.scheduler.add_thread(&mut self.threads, key);
                events.push(SimEvent::IoCompleted { thread: id });
            }
        }
    }

    fn run_current(&mut self, events: &mut Vec<SimEvent>) {
        let Some(key) = self.running else {
            return;
        };

        // The work retired here was done during the previous tick, the one
        // in which the thread was dispatched or last continued.
        let worked_at = self.now.saturating_sub(1);
        self.slice_remaining = self.slice_remaining.saturating_sub(1);

        let thread = self.threads.get_mut(key);
        let id = thread.id;
        debug_assert!(thread.remaining_time > 0, "Thread {id} ran with no work left");
        thread.remaining_time = thread.remaining_time.saturating_sub(1);
        if thread.start_time.is_none() {
            thread.start_time = Some(worked_at);
        }

        if thread.remaining_time == 0 {
            self.threads.mark_terminated(key, worked_at);
            self.scheduler.thread_exit(&mut self.threads, key);
            self.release_cpu(id);
            events.push(SimEvent::Terminated { thread: id });
            return;
        }

        if thread.does_io() {
            thread.cpu_since_io += 1;
            if thread.cpu_since_io >= thread.io_frequency {
                let duration = clamp_io_duration(thread.io_duration);
                self.threads.mark_blocked(key, duration);
                self.release_cpu(id);
                events.push(SimEvent::IoBlocked {
                    thread: id,
                    duration,
                });
                return;
            }
        }

        if self.slice_remaining == 0 {
            self.scheduler.thread_yield(&mut self.threads, key);
            self.release_cpu(id);
            events.push(SimEvent::Preempted { thread: id });
        }
    }

    fn dispatch(&mut self, events: &mut Vec<SimEvent>) {
        let Some(key) = self.scheduler.pick_next(&mut self.threads) else {
            events.push(SimEvent::CpuIdle);
            return;
        };

        self.threads.set_running(key, self.now);
        self.running = Some(key);
        self.slice_remaining = self.time_slice;

        let to = self.threads.get(key).id;
        let from = self.prev_running;
        let context_switch = from.is_some_and(|prev| prev != to);
        if context_switch {
            self.context_switches += 1;
        }
        self.prev_running = Some(to);
        events.push(SimEvent::Dispatched {
            from,
            to,
            context_switch,
        });
    }

    fn account_waiting(&mut self) {
        for index in 0..self.threads.len() {
            let key = self.threads.keys()[index];
            let thread = self.threads.get_mut(key);
            match thread.status {
                ThreadStatus::Ready => {
                    thread.wait_time += 1;
                    thread.runnable_time += 1;
                }
                ThreadStatus::Running => thread.runnable_time += 1,
                ThreadStatus::Blocked | ThreadStatus::Terminated => {}
            }
        }
    }

    fn release_cpu(&mut self, id: ThreadId) {
        self.running = None;
        self.prev_running = Some(id);
    }

    pub fn advance_time(&mut self, delta: Ticks) {
        self.now = self.now.saturating_add(delta);
    }

    pub fn now(&self) -> Ticks {
        self.now
    }

    pub fn running(&self) -> Option<ThreadKey> {
        self.running
    }

    pub fn context_switches(&self) -> u64 {
        self.context_switches
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }
}
