use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::{Scheduler, ThreadKey, ThreadTable, Ticks};
use crate::core::{PRI_DEFAULT, PRI_MAX, PRI_MIN, ThreadStatus};

/// Ready ticks before an aged thread gains one priority level.
pub const AGING_THRESHOLD: u32 = 100;

/// Static priority with round-robin among equals.
///
/// Priority is fixed at first admission as `31 - nice`. Higher runs first;
/// among equal priorities the thread admitted earliest wins. With aging
/// enabled, a thread that sits Ready for [`AGING_THRESHOLD`] ticks is bumped
/// one level.
#[derive(Debug, Clone, Default)]
pub struct StaticPriority {
    ready: VecDeque<ThreadKey>,
    aging: Option<FxHashMap<ThreadKey, u32>>,
}

impl StaticPriority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aging() -> Self {
        Self {
            ready: VecDeque::new(),
            aging: Some(FxHashMap::default()),
        }
    }

    pub fn aging_enabled(&self) -> bool {
        self.aging.is_some()
    }

    pub fn initial_priority(nice: i32) -> u8 {
        (PRI_DEFAULT as i32 - nice).clamp(PRI_MIN as i32, PRI_MAX as i32) as u8
    }

    fn enqueue(&mut self, thread: ThreadKey) {
        debug_assert!(!self.ready.contains(&thread), "thread already queued");
        self.ready.push_back(thread);
    }
}

impl Scheduler for StaticPriority {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn add_thread(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        let t = threads.get_mut(thread);
        if t.priority.is_none() {
            t.priority = Some(Self::initial_priority(t.nice));
        }
        if t.status == ThreadStatus::Ready {
            self.enqueue(thread);
        }
    }

    fn tick(&mut self, threads: &mut ThreadTable, _now: Ticks, _running: Option<ThreadKey>) {
        let Some(ages) = self.aging.as_mut() else {
            return;
        };
        for &key in &self.ready {
            let age = ages.entry(key).or_insert(0);
            *age += 1;
            if *age >= AGING_THRESHOLD {
                *age = 0;
                let t = threads.get_mut(key);
                t.priority = t.priority.map(|p| (p + 1).min(PRI_MAX));
            }
        }
    }

    fn pick_next(&mut self, threads: &mut ThreadTable) -> Option<ThreadKey> {
        // First occurrence of the maximum keeps FIFO order among equals
        let mut best: Option<(usize, u8)> = None;
        for (index, &key) in self.ready.iter().enumerate() {
            let priority = threads.get(key).priority.unwrap_or(PRI_DEFAULT);
            if best.is_none_or(|(_, p)| priority > p) {
                best = Some((index, priority));
            }
        }

        let (index, _) = best?;
        let key = self.ready.remove(index)?;
        if let Some(ages) = self.aging.as_mut() {
            ages.remove(&key);
        }
        threads.get_mut(key).status = ThreadStatus::Running;
        Some(key)
    }

    fn thread_yield(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        threads.mark_ready(thread);
        self.enqueue(thread);
    }

    fn thread_exit(&mut self, _threads: &mut ThreadTable, thread: ThreadKey) {
        self.ready.retain(|&key| key != thread);
        if let Some(ages) = self.aging.as_mut() {
            ages.remove(&thread);
        }
    }

    fn ready_len(&self) -> usize {
        self.ready.len()
    }

    fn is_queued(&self, thread: ThreadKey) -> bool {
        self.ready.contains(&thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Thread;

    fn admit(
        table: &mut ThreadTable,
        scheduler: &mut StaticPriority,
        id: u32,
        priority: u8,
    ) -> ThreadKey {
        let key = table
            .insert(Thread::new(id, format!("t{id}"), 0, 0, 100).with_priority(priority))
            .unwrap();
        table.mark_ready(key);
        scheduler.add_thread(table, key);
        key
    }

    #[test]
    fn priority_follows_nice() {
        assert_eq!(StaticPriority::initial_priority(0), 31);
        assert_eq!(StaticPriority::initial_priority(-20), 51);
        assert_eq!(StaticPriority::initial_priority(19), 12);
    }

    #[test]
    fn admission_assigns_priority_once() {
        let mut table = ThreadTable::new();
        let mut scheduler = StaticPriority::new();
        let key = table.insert(Thread::new(1, "t", 5, 0, 10)).unwrap();
        table.mark_ready(key);
        scheduler.add_thread(&mut table, key);
        assert_eq!(table.get(key).priority, Some(26));

        let picked = scheduler.pick_next(&mut table).unwrap();
        table.get_mut(picked).nice = -5;
        scheduler.thread_yield(&mut table, picked);
        assert_eq!(table.get(key).priority, Some(26));
    }

    #[test]
    fn highest_priority_first_fifo_among_equals() {
        let mut table = ThreadTable::new();
        let mut scheduler = StaticPriority::new();
        let _p10 = admit(&mut table, &mut scheduler, 1, 10);
        let a = admit(&mut table, &mut scheduler, 2, 30);
        let b = admit(&mut table, &mut scheduler, 3, 30);
        let _p5 = admit(&mut table, &mut scheduler, 4, 5);

        let first = scheduler.pick_next(&mut table).unwrap();
        assert_eq!(first, a);
        assert_eq!(table.get(first).status, ThreadStatus::Running);
        scheduler.thread_yield(&mut table, first);

        assert_eq!(scheduler.pick_next(&mut table), Some(b));
        assert_eq!(scheduler.ready_len(), 3);
    }

    #[test]
    fn empty_queue_picks_nothing() {
        let mut table = ThreadTable::new();
        let mut scheduler = StaticPriority::new();
        assert_eq!(scheduler.pick_next(&mut table), None);
    }

    #[test]
    fn aging_raises_starved_thread() {
        let mut table = ThreadTable::new();
        let mut scheduler = StaticPriority::with_aging();
        let low = admit(&mut table, &mut scheduler, 1, 10);

        for now in 0..AGING_THRESHOLD as Ticks {
            scheduler.tick(&mut table, now, None);
        }
        assert_eq!(table.get(low).priority, Some(11));
        // aging keeps its own counter, the wait statistic is untouched
        assert_eq!(table.get(low).wait_time, 0);
    }

    #[test]
    fn aging_caps_at_max() {
        let mut table = ThreadTable::new();
        let mut scheduler = StaticPriority::with_aging();
        let top = admit(&mut table, &mut scheduler, 1, PRI_MAX);
        for now in 0..(AGING_THRESHOLD * 3) as Ticks {
            scheduler.tick(&mut table, now, None);
        }
        assert_eq!(table.get(top).priority, Some(PRI_MAX));
    }

    #[test]
    fn exit_removes_from_queue() {
        let mut table = ThreadTable::new();
        let mut scheduler = StaticPriority::new();
        let key = admit(&mut table, &mut scheduler, 1, 20);
        scheduler.thread_exit(&mut table, key);
        assert!(!scheduler.is_queued(key));
        assert_eq!(scheduler.pick_next(&mut table), None);
    }
}
