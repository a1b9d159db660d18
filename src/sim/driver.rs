use std::thread;

use log::{info, trace};

use super::trace::{SimOutcome, Snapshot};
use crate::{
    config::SimConfig,
    core::{
        NICE_MAX, NICE_MIN, SchedCore, SimEvent, Thread, ThreadKey, ThreadStatus, ThreadTable,
        Ticks,
    },
    error::ConfigError,
    scheduler::{AnyScheduler, PolicyKind, Scheduler},
};

/// Drives one run: admits arrivals, ticks the engine and records the trace.
pub struct Simulator<S: Scheduler> {
    pub core: SchedCore<S>,
    config: SimConfig,
    // Keys sorted by arrival time; same-tick arrivals keep input order
    arrivals: Vec<ThreadKey>,
    arrival_cursor: usize,
    history: Vec<Snapshot>,
}

impl<S: Scheduler> Simulator<S> {
    /// Every thread starts out Blocked, meaning "not arrived yet", with its
    /// whole burst left, whatever state it was handed in with.
    pub fn new(
        scheduler: S,
        threads: Vec<Thread>,
        config: SimConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut table = ThreadTable::with_capacity(threads.len());
        for mut thread in threads {
            if !(NICE_MIN..=NICE_MAX).contains(&thread.nice) {
                return Err(ConfigError::NiceOutOfRange {
                    id: thread.id,
                    nice: thread.nice,
                });
            }
            if thread.burst_time == 0 {
                return Err(ConfigError::ZeroBurst(thread.id));
            }
            thread.status = ThreadStatus::Blocked;
            thread.remaining_time = thread.burst_time;
            thread.io_remaining = 0;
            thread.cpu_since_io = 0;

            let id = thread.id;
            table
                .insert(thread)
                .ok_or(ConfigError::DuplicateThreadId(id))?;
        }

        let mut arrivals = table.keys().to_vec();
        arrivals.sort_by_key(|&key| table.get(key).arrival_time);

        Ok(Self {
            core: SchedCore::new(scheduler, table, config.time_slice),
            config,
            arrivals,
            arrival_cursor: 0,
            history: Vec::new(),
        })
    }

    pub fn step(&mut self) -> Vec<SimEvent> {
        let now = self.core.now();
        let mut events = self.handle_arrivals();
        events.extend(self.core.tick());

        for event in &events {
            trace!("t={now} {event:?}");
        }
        if self.config.record_trace {
            self.record(now);
        }

        self.core.advance_time(1);
        events
    }

    fn handle_arrivals(&mut self) -> Vec<SimEvent> {
        let now = self.core.now();
        let mut events = Vec::new();
        // Contiguous, since arrivals are sorted
        while let Some(&key) = self.arrivals.get(self.arrival_cursor) {
            let thread = self.core.threads.get(key);
            if thread.arrival_time != now {
                break;
            }
            if thread.status == ThreadStatus::Blocked {
                events.push(self.core.admit(key));
            }
            self.arrival_cursor += 1;
        }
        events
    }

    fn record(&mut self, now: Ticks) {
        let arrived = self
            .core
            .threads
            .iter()
            .filter(|(_, t)| t.arrival_time <= now)
            .map(|(_, t)| Snapshot::of(now, t));
        self.history.extend(arrived);
    }

    pub fn all_threads_completed(&self) -> bool {
        self.core.threads.all_terminated()
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    /// Step until every thread has terminated or the tick budget runs out.
    pub fn run(mut self) -> SimOutcome {
        let policy = self.core.scheduler.name();
        info!(
            "{policy}: simulating {} threads for at most {} ticks",
            self.core.threads.len(),
            self.config.max_ticks
        );

        while !self.core.threads.is_empty() && self.core.now() < self.config.max_ticks {
            self.step();
            if self.all_threads_completed() {
                break;
            }
        }

        let outcome = SimOutcome {
            policy,
            context_switches: self.core.context_switches(),
            ticks: self.core.now(),
            busy_ticks: self.core.observer().busy_ticks(),
            history: self.history,
            threads: self.core.threads.into_threads(),
        };
        info!(
            "{policy}: {} ticks, {}/{} threads finished, {} context switches",
            outcome.ticks,
            outcome.finished().count(),
            outcome.threads.len(),
            outcome.context_switches
        );
        outcome
    }
}

/// Run every policy on its own copy of `threads`.
///
/// Runs share nothing, so each gets its own OS thread. Results come back in
/// the order of `policies`.
pub fn compare(
    threads: &[Thread],
    policies: &[PolicyKind],
    config: SimConfig,
) -> Result<Vec<SimOutcome>, ConfigError> {
    let schedulers = policies.iter().map(|kind| kind.build()).collect();
    compare_schedulers(threads, schedulers, config)
}

/// Like [`compare`], for schedulers that were configured by the caller.
pub fn compare_schedulers(
    threads: &[Thread],
    schedulers: Vec<AnyScheduler>,
    config: SimConfig,
) -> Result<Vec<SimOutcome>, ConfigError> {
    thread::scope(|scope| {
        let runs: Vec<_> = schedulers
            .into_iter()
            .map(|scheduler| {
                let threads = threads.to_vec();
                scope.spawn(move || Simulator::new(scheduler, threads, config).map(Simulator::run))
            })
            .collect();

        runs.into_iter()
            .map(|run| {
                run.join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    })
}
