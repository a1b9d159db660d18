use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;
use slotmap::{SlotMap, new_key_type};

use super::fixed_point::Fp;

pub type ThreadId = u32;
pub type Ticks = u64;
pub type Nice = i32;

pub const NICE_MIN: Nice = -20;
pub const NICE_MAX: Nice = 19;

pub const PRI_MIN: u8 = 0;
pub const PRI_DEFAULT: u8 = 31;
pub const PRI_MAX: u8 = 63;
pub const NUM_PRIORITIES: usize = PRI_MAX as usize + 1;

new_key_type! {
    pub struct ThreadKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ThreadStatus {
    Running,
    Ready,
    Blocked,
    Terminated,
}

/// One schedulable unit of work, plus everything the policies and the
/// metrics layer read or write about it.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub id: ThreadId,
    pub name: Arc<str>,
    pub status: ThreadStatus,
    pub nice: Nice,

    // Static priority / MLFQS
    pub priority: Option<u8>,
    pub recent_cpu: Fp,

    // CFS
    pub vruntime: u64,
    pub weight: u32,

    // Workload
    pub arrival_time: Ticks,
    pub burst_time: Ticks,
    pub remaining_time: Ticks,
    pub io_frequency: Ticks,
    pub io_duration: Ticks,
    pub io_remaining: Ticks,
    pub cpu_since_io: Ticks,

    // Statistics
    pub start_time: Option<Ticks>,
    pub finish_time: Option<Ticks>,
    pub wait_time: Ticks,
    pub last_scheduled: Option<Ticks>,
    pub runnable_time: Ticks,
}

impl Thread {
    /// A CPU-only thread that has not arrived yet.
    pub fn new(
        id: ThreadId,
        name: impl Into<Arc<str>>,
        nice: Nice,
        arrival_time: Ticks,
        burst_time: Ticks,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            status: ThreadStatus::Blocked,
            nice,
            priority: None,
            recent_cpu: Fp::ZERO,
            vruntime: 0,
            weight: 1024,
            arrival_time,
            burst_time,
            remaining_time: burst_time,
            io_frequency: 0,
            io_duration: 0,
            io_remaining: 0,
            cpu_since_io: 0,
            start_time: None,
            finish_time: None,
            wait_time: 0,
            last_scheduled: None,
            runnable_time: 0,
        }
    }

    /// Block for `duration` ticks after every `frequency` ticks of CPU.
    pub fn with_io(mut self, frequency: Ticks, duration: Ticks) -> Self {
        self.io_frequency = frequency;
        self.io_duration = duration;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority.min(PRI_MAX));
        self
    }

    pub fn does_io(&self) -> bool {
        self.io_frequency > 0 && self.io_duration > 0
    }

    pub fn cpu_time(&self) -> Ticks {
        self.burst_time.saturating_sub(self.remaining_time)
    }

    pub fn is_finished(&self) -> bool {
        self.status == ThreadStatus::Terminated
    }

    /// Ticks from arrival to completion, if it completed.
    pub fn turnaround(&self) -> Option<Ticks> {
        self.finish_time
            .map(|finish| finish.saturating_sub(self.arrival_time))
    }

    pub fn response(&self) -> Option<Ticks> {
        self.start_time
            .map(|start| start.saturating_sub(self.arrival_time))
    }
}

/// Arena owning every thread of one run. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct ThreadTable {
    slots: SlotMap<ThreadKey, Thread>,
    order: Vec<ThreadKey>,
    by_id: FxHashMap<ThreadId, ThreadKey>,
}

impl ThreadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            order: Vec::with_capacity(capacity),
            by_id: FxHashMap::default(),
        }
    }

    /// Returns `None` if a thread with the same id is already present.
    pub fn insert(&mut self, thread: Thread) -> Option<ThreadKey> {
        if self.by_id.contains_key(&thread.id) {
            return None;
        }
        let id = thread.id;
        let key = self.slots.insert(thread);
        self.order.push(key);
        self.by_id.insert(id, key);
        Some(key)
    }

    pub fn get(&self, key: ThreadKey) -> &Thread {
        &self.slots[key]
    }

    pub fn get_mut(&mut self, key: ThreadKey) -> &mut Thread {
        &mut self.slots[key]
    }

    pub fn keys(&self) -> &[ThreadKey] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (ThreadKey, &Thread)> + '_ {
        self.order.iter().map(|&key| (key, &self.slots[key]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn all_terminated(&self) -> bool {
        self.slots.values().all(Thread::is_finished)
    }

    pub fn mark_ready(&mut self, key: ThreadKey) {
        let thread = self.get_mut(key);
        debug_assert!(
            thread.status != ThreadStatus::Terminated,
            "Terminated thread {} cannot become ready",
            thread.id
        );
        thread.status = ThreadStatus::Ready;
    }

    pub fn mark_blocked(&mut self, key: ThreadKey, io_remaining: Ticks) {
        let thread = self.get_mut(key);
        thread.status = ThreadStatus::Blocked;
        thread.io_remaining = io_remaining;
        thread.cpu_since_io = 0;
    }

    pub fn mark_terminated(&mut self, key: ThreadKey, finish_time: Ticks) {
        let thread = self.get_mut(key);
        debug_assert!(
            thread.status == ThreadStatus::Running,
            "Thread {} must be running before it terminates",
            thread.id
        );
        debug_assert_eq!(thread.remaining_time, 0);
        thread.status = ThreadStatus::Terminated;
        thread.finish_time = Some(finish_time);
    }

    pub fn set_running(&mut self, key: ThreadKey, now: Ticks) {
        let thread = self.get_mut(key);
        thread.status = ThreadStatus::Running;
        thread.last_scheduled = Some(now);
    }

    /// Hand the threads back in insertion order.
    pub fn into_threads(mut self) -> Vec<Thread> {
        self.order
            .iter()
            .filter_map(|&key| self.slots.remove(key))
            .collect()
    }
}
