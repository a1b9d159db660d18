use std::cmp::{self, Ordering};
use std::fmt;

use keyed_priority_queue::KeyedPriorityQueue;
use log::debug;

use super::{Scheduler, ThreadKey, ThreadTable, Ticks};
use crate::core::{NICE_MAX, NICE_MIN, Nice, ThreadStatus};

pub const NICE_0_WEIGHT: u64 = 1024;

/// Extra scale so heavy threads still accrue a non-zero vruntime per tick.
pub const VRUNTIME_PRECISION: u64 = 1000;

/// Linux `sched_prio_to_weight`, nice -20 first.
pub const PRIO_TO_WEIGHT: [u32; 40] = [
    88761, 71755, 56483, 46273, 36291, // -20 .. -16
    29154, 23254, 18705, 14949, 11916, // -15 .. -11
    9548, 7620, 6100, 4904, 3906, // -10 .. -6
    3121, 2501, 1991, 1586, 1277, // -5 .. -1
    1024, 820, 655, 526, 423, // 0 .. 4
    335, 272, 215, 172, 137, // 5 .. 9
    110, 87, 70, 56, 45, // 10 .. 14
    36, 29, 23, 18, 15, // 15 .. 19
];

pub fn nice_to_weight(nice: Nice) -> u32 {
    PRIO_TO_WEIGHT[(nice.clamp(NICE_MIN, NICE_MAX) - NICE_MIN) as usize]
}

/// Weighted vruntime for `delta` ticks of CPU.
pub fn calc_delta_fair(delta: Ticks, weight: u32) -> u64 {
    let weight = cmp::max(weight, 1) as u64;
    delta * NICE_0_WEIGHT * VRUNTIME_PRECISION / weight
}

/// Queue order: smallest vruntime first, then earliest insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Vslot {
    vruntime: u64,
    seq: u64,
}

// KeyedPriorityQueue is a max-heap, so we need to flip-flop Vslot's Ord
impl PartialOrd for Vslot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Vslot {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.vruntime, other.seq).cmp(&(self.vruntime, self.seq))
    }
}

/// CFS-style weighted fair scheduler.
pub struct WeightedFair {
    ready: KeyedPriorityQueue<ThreadKey, Vslot>,
    min_vruntime: u64,
    next_seq: u64,
}

impl fmt::Debug for WeightedFair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedFair")
            .field("ready", &self.ready.len())
            .field("min_vruntime", &self.min_vruntime)
            .finish()
    }
}

impl Default for WeightedFair {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightedFair {
    pub fn new() -> Self {
        Self {
            ready: KeyedPriorityQueue::new(),
            min_vruntime: 0,
            next_seq: 0,
        }
    }

    pub fn min_vruntime(&self) -> u64 {
        self.min_vruntime
    }

    fn enqueue(&mut self, threads: &ThreadTable, thread: ThreadKey) {
        let slot = Vslot {
            vruntime: threads.get(thread).vruntime,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        let previous = self.ready.push(thread, slot);
        debug_assert!(previous.is_none(), "thread already queued");
    }

    // Watermark only ever moves forward
    fn update_min_vruntime(&mut self) {
        if let Some((_, leftmost)) = self.ready.peek() {
            if leftmost.vruntime > self.min_vruntime {
                debug!(
                    "cfs min_vruntime {} -> {}",
                    self.min_vruntime, leftmost.vruntime
                );
                self.min_vruntime = leftmost.vruntime;
            }
        }
    }
}

impl Scheduler for WeightedFair {
    fn name(&self) -> &'static str {
        "cfs"
    }

    fn add_thread(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        let t = threads.get_mut(thread);
        t.weight = nice_to_weight(t.nice);
        t.vruntime = cmp::max(t.vruntime, self.min_vruntime);
        if t.status == ThreadStatus::Ready {
            self.enqueue(threads, thread);
        }
    }

    fn tick(&mut self, threads: &mut ThreadTable, _now: Ticks, running: Option<ThreadKey>) {
        let Some(key) = running else {
            return;
        };
        let t = threads.get_mut(key);
        t.vruntime += calc_delta_fair(1, t.weight);
        self.update_min_vruntime();
    }

    fn pick_next(&mut self, threads: &mut ThreadTable) -> Option<ThreadKey> {
        let (key, _) = self.ready.pop()?;
        threads.get_mut(key).status = ThreadStatus::Running;
        Some(key)
    }

    fn thread_yield(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        threads.mark_ready(thread);
        self.enqueue(threads, thread);
    }

    fn thread_exit(&mut self, _threads: &mut ThreadTable, thread: ThreadKey) {
        self.ready.remove(&thread);
        self.update_min_vruntime();
    }

    fn ready_len(&self) -> usize {
        self.ready.len()
    }

    fn is_queued(&self, thread: ThreadKey) -> bool {
        self.ready.get_priority(&thread).is_some()
    }
}
