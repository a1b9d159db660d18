use std::collections::VecDeque;

use log::debug;

use super::{Scheduler, ThreadKey, ThreadTable, Ticks};
use crate::{
    config::TIMER_FREQ,
    core::{Fp, NUM_PRIORITIES, Nice, PRI_MAX, PRI_MIN, ThreadStatus},
};

pub const PRIORITY_PERIOD: Ticks = 4;

/// 4.4BSD-style feedback queue over 64 priority levels.
#[derive(Debug, Clone)]
pub struct FeedbackQueue {
    queues: Vec<VecDeque<ThreadKey>>,
    load_avg: Fp,
    // Admitted and not yet exited, in admission order
    active: Vec<ThreadKey>,
}

impl Default for FeedbackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackQueue {
    pub fn new() -> Self {
        Self {
            queues: vec![VecDeque::new(); NUM_PRIORITIES],
            load_avg: Fp::ZERO,
            active: Vec::new(),
        }
    }

    pub fn load_avg(&self) -> Fp {
        self.load_avg
    }

    pub fn compute_priority(recent_cpu: Fp, nice: Nice) -> u8 {
        let priority =
            Fp::from_int(PRI_MAX as i32) - recent_cpu.div_int(4) - Fp::from_int(nice * 2);
        priority
            .to_int_trunc()
            .clamp(PRI_MIN as i32, PRI_MAX as i32) as u8
    }

    fn enqueue(&mut self, threads: &ThreadTable, thread: ThreadKey) {
        let priority = threads.get(thread).priority.unwrap_or(PRI_MAX);
        debug_assert!(!self.is_queued(thread), "thread already queued");
        self.queues[priority as usize].push_back(thread);
    }

    fn update_load_avg(&mut self, running: Option<ThreadKey>) -> i32 {
        let ready_count = (self.ready_len() + usize::from(running.is_some())) as i32;
        let decay = Fp::from_int(59).div(Fp::from_int(60));
        let gain = Fp::from_int(1).div(Fp::from_int(60));
        self.load_avg = decay.mul(self.load_avg) + gain.mul_int(ready_count);
        ready_count
    }

    fn decay_recent_cpu(&self, threads: &mut ThreadTable) {
        let twice_load = self.load_avg.mul_int(2);
        let coef = twice_load.div(twice_load.add_int(1));
        for &key in &self.active {
            let t = threads.get_mut(key);
            if t.status != ThreadStatus::Terminated {
                t.recent_cpu = coef.mul(t.recent_cpu).add_int(t.nice);
            }
        }
    }

    fn recompute_priorities(&mut self, threads: &mut ThreadTable) {
        // Buckets go stale once priorities move, so drain everything first
        let mut queued = Vec::with_capacity(self.ready_len());
        for queue in &mut self.queues {
            queued.extend(queue.drain(..));
        }

        for &key in &self.active {
            let t = threads.get_mut(key);
            if t.status != ThreadStatus::Terminated {
                t.priority = Some(Self::compute_priority(t.recent_cpu, t.nice));
            }
        }

        for key in queued {
            self.enqueue(threads, key);
        }
    }
}

impl Scheduler for FeedbackQueue {
    fn name(&self) -> &'static str {
        "mlfqs"
    }

    fn add_thread(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        let t = threads.get_mut(thread);
        t.recent_cpu = Fp::ZERO;
        t.priority = Some(Self::compute_priority(t.recent_cpu, t.nice));
        let ready = t.status == ThreadStatus::Ready;

        if !self.active.contains(&thread) {
            self.active.push(thread);
        }
        if ready {
            self.enqueue(threads, thread);
        }
    }

    fn tick(&mut self, threads: &mut ThreadTable, now: Ticks, running: Option<ThreadKey>) {
        if let Some(key) = running {
            let t = threads.get_mut(key);
            t.recent_cpu = t.recent_cpu.add_int(1);
        }

        if now % TIMER_FREQ == 0 {
            let ready_count = self.update_load_avg(running);
            self.decay_recent_cpu(threads);
            debug!(
                "mlfqs t={now}: load_avg={} ready={ready_count}",
                self.load_avg
            );
        }

        if now % PRIORITY_PERIOD == 0 {
            self.recompute_priorities(threads);
        }
    }

    fn pick_next(&mut self, threads: &mut ThreadTable) -> Option<ThreadKey> {
        let key = self
            .queues
            .iter_mut()
            .rev()
            .find_map(|queue| queue.pop_front())?;
        threads.get_mut(key).status = ThreadStatus::Running;
        Some(key)
    }

    fn thread_yield(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        threads.mark_ready(thread);
        self.enqueue(threads, thread);
    }

    fn thread_exit(&mut self, threads: &mut ThreadTable, thread: ThreadKey) {
        if let Some(priority) = threads.get(thread).priority {
            self.queues[priority as usize].retain(|&key| key != thread);
        }
        self.active.retain(|&key| key != thread);
    }

    fn ready_len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    fn is_queued(&self, thread: ThreadKey) -> bool {
        self.queues.iter().any(|queue| queue.contains(&thread))
    }
}
