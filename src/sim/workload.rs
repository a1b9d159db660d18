use std::fmt;
use std::str::FromStr;

use rand::prelude::*;
use serde::Serialize;

use crate::{
    core::{Nice, Thread, ThreadId, Ticks},
    error::ConfigError,
};

pub const DEFAULT_THREAD_COUNT: usize = 10;
pub const DEFAULT_SEED: u64 = 42;

/// Named benchmark workloads. Each one is a seeded recipe for a thread set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    Mixed,
    CpuBound,
    IoBound,
    WebServer,
    Database,
    Batch,
    Gaming,
    ExtremeNice,
    ExtremeNiceFairness,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 9] = [
        WorkloadKind::Mixed,
        WorkloadKind::CpuBound,
        WorkloadKind::IoBound,
        WorkloadKind::WebServer,
        WorkloadKind::Database,
        WorkloadKind::Batch,
        WorkloadKind::Gaming,
        WorkloadKind::ExtremeNice,
        WorkloadKind::ExtremeNiceFairness,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadKind::Mixed => "mixed",
            WorkloadKind::CpuBound => "cpu_bound",
            WorkloadKind::IoBound => "io_bound",
            WorkloadKind::WebServer => "web_server",
            WorkloadKind::Database => "database",
            WorkloadKind::Batch => "batch",
            WorkloadKind::Gaming => "gaming",
            WorkloadKind::ExtremeNice => "extreme_nice",
            WorkloadKind::ExtremeNiceFairness => "extreme_nice_fairness",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        WorkloadKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownWorkload(s.to_owned()))
    }
}

/// Generate `count` threads for `kind`. The same seed always yields the same
/// threads. Ids run from 1 to `count`.
pub fn generate(kind: WorkloadKind, count: usize, seed: u64) -> Vec<Thread> {
    let mut workload = Generator::new(seed, count);

    match kind {
        WorkloadKind::Mixed => workload.mixed(count),
        WorkloadKind::CpuBound => workload.cpu_bound(count),
        WorkloadKind::IoBound => workload.io_bound(count),
        WorkloadKind::WebServer => workload.web_server(count),
        WorkloadKind::Database => workload.database(count),
        WorkloadKind::Batch => workload.batch(count),
        WorkloadKind::Gaming => workload.gaming(count),
        WorkloadKind::ExtremeNice => workload.extreme_nice(count, 2000, ""),
        WorkloadKind::ExtremeNiceFairness => workload.extreme_nice(count, 1000, "_fair"),
    }

    workload.threads
}

// Share of `count` that goes to the first group of a two-group workload.
fn split(count: usize, percent: usize) -> usize {
    count * percent / 100
}

struct Generator {
    rng: StdRng,
    threads: Vec<Thread>,
}

impl Generator {
    fn new(seed: u64, count: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            threads: Vec::with_capacity(count),
        }
    }

    fn next_id(&self) -> ThreadId {
        self.threads.len() as ThreadId + 1
    }

    fn push(
        &mut self,
        name: String,
        nice: Nice,
        arrival: Ticks,
        burst: Ticks,
        (io_frequency, io_duration): (Ticks, Ticks),
    ) {
        let thread = Thread::new(self.next_id(), name, nice, arrival, burst)
            .with_io(io_frequency, io_duration);
        self.threads.push(thread);
    }

    fn mixed(&mut self, count: usize) {
        for _ in 0..count {
            let id = self.next_id();
            let burst = self.rng.random_range(100..=500);
            let io_freq = self.rng.random_range(0..=500);
            let io_dur = self.rng.random_range(0..=200);
            let nice = self.rng.random_range(-5..=5);
            let arrival = self.rng.random_range(0..=100);
            self.push(format!("mixed_{id}"), nice, arrival, burst, (io_freq, io_dur));
        }
    }

    fn cpu_bound(&mut self, count: usize) {
        for i in 1..=count {
            let burst = self.rng.random_range(300..=800);
            let arrival = self.rng.random_range(0..=50);
            self.push(format!("cpu_{i}"), 0, arrival, burst, (0, 0));
        }
    }

    fn io_bound(&mut self, count: usize) {
        let io_count = split(count, 60);
        for i in 1..=io_count {
            let burst = self.rng.random_range(30..=100);
            let arrival = self.rng.random_range(0..=100);
            let io_freq = self.rng.random_range(10..=30);
            let io_dur = self.rng.random_range(50..=150);
            self.push(format!("io_{i}"), 0, arrival, burst, (io_freq, io_dur));
        }
        for i in 1..=count - io_count {
            let burst = self.rng.random_range(500..=1000);
            let arrival = self.rng.random_range(0..=50);
            self.push(format!("cpu_competitor_{i}"), 0, arrival, burst, (0, 0));
        }
    }

    fn web_server(&mut self, count: usize) {
        let short_count = split(count, 90);
        for i in 1..=short_count {
            let burst = self.rng.random_range(10..=50);
            let arrival = self.rng.random_range(0..=200);
            let io_freq = self.rng.random_range(20..=50);
            let io_dur = self.rng.random_range(10..=30);
            self.push(format!("web_short_{i}"), -5, arrival, burst, (io_freq, io_dur));
        }
        for i in 1..=count - short_count {
            let burst = self.rng.random_range(200..=600);
            let arrival = self.rng.random_range(0..=200);
            let io_freq = self.rng.random_range(100..=300);
            let io_dur = self.rng.random_range(50..=100);
            self.push(format!("web_long_{i}"), 5, arrival, burst, (io_freq, io_dur));
        }
    }

    fn database(&mut self, count: usize) {
        let select_count = split(count, 70);
        for i in 1..=select_count {
            let burst = self.rng.random_range(30..=150);
            let arrival = self.rng.random_range(0..=100);
            let io_freq = self.rng.random_range(10..=50);
            let io_dur = self.rng.random_range(20..=80);
            self.push(format!("db_select_{i}"), 0, arrival, burst, (io_freq, io_dur));
        }
        for i in 1..=count - select_count {
            let burst = self.rng.random_range(200..=600);
            let arrival = self.rng.random_range(0..=100);
            let io_freq = self.rng.random_range(50..=200);
            let io_dur = self.rng.random_range(100..=300);
            self.push(format!("db_tx_{i}"), 0, arrival, burst, (io_freq, io_dur));
        }
    }

    fn batch(&mut self, count: usize) {
        for i in 0..count {
            let burst = self.rng.random_range(400..=800);
            // Staggered, one job every 10 ticks
            let arrival = i as Ticks * 10;
            self.push(format!("batch_{}", i + 1), 0, arrival, burst, (0, 0));
        }
    }

    fn gaming(&mut self, count: usize) {
        let render_count = split(count, 30);
        for i in 0..render_count {
            let burst = self.rng.random_range(50..=150);
            // One frame every 16 ticks
            let arrival = i as Ticks * 16;
            let io_freq = self.rng.random_range(5..=20);
            let io_dur = self.rng.random_range(10..=30);
            let name = format!("game_render_{}", i + 1);
            self.push(name, -10, arrival, burst, (io_freq, io_dur));
        }
        for i in 1..=count - render_count {
            let burst = self.rng.random_range(200..=500);
            let arrival = self.rng.random_range(0..=100);
            self.push(format!("game_ai_{i}"), 10, arrival, burst, (0, 0));
        }
    }

    fn extreme_nice(&mut self, count: usize, burst: Ticks, suffix: &str) {
        let half = count / 2;
        for i in 1..=half {
            let arrival = self.rng.random_range(0..=50);
            let name = format!("nice_minus20{suffix}_{i}");
            self.push(name, -20, arrival, burst, (0, 0));
        }
        for i in 1..=count - half {
            let arrival = self.rng.random_range(0..=50);
            self.push(format!("nice_19{suffix}_{i}"), 19, arrival, burst, (0, 0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NICE_MAX, NICE_MIN};

    #[test]
    fn names_round_trip() {
        for kind in WorkloadKind::ALL {
            assert_eq!(kind.as_str().parse::<WorkloadKind>(), Ok(kind));
        }
        assert_eq!(
            "Web_Server".parse::<WorkloadKind>(),
            Ok(WorkloadKind::WebServer)
        );
        assert_eq!(
            "nope".parse::<WorkloadKind>(),
            Err(ConfigError::UnknownWorkload("nope".into()))
        );
    }

    #[test]
    fn same_seed_same_threads() {
        for kind in WorkloadKind::ALL {
            let a = generate(kind, 20, 7);
            let b = generate(kind, 20, 7);
            let key = |t: &Thread| (t.id, t.nice, t.arrival_time, t.burst_time, t.io_frequency);
            assert_eq!(
                a.iter().map(key).collect::<Vec<_>>(),
                b.iter().map(key).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn ids_are_sequential_and_nice_in_range() {
        for kind in WorkloadKind::ALL {
            let threads = generate(kind, 13, DEFAULT_SEED);
            assert_eq!(threads.len(), 13);
            for (i, thread) in threads.iter().enumerate() {
                assert_eq!(thread.id, i as ThreadId + 1);
                assert!((NICE_MIN..=NICE_MAX).contains(&thread.nice));
                assert!(thread.burst_time > 0);
                assert_eq!(thread.remaining_time, thread.burst_time);
            }
        }
    }

    #[test]
    fn group_splits_follow_recipe() {
        let web = generate(WorkloadKind::WebServer, 10, 1);
        assert_eq!(web.iter().filter(|t| t.nice == -5).count(), 9);
        assert_eq!(web[9].name.as_ref(), "web_long_1");

        let io = generate(WorkloadKind::IoBound, 10, 1);
        assert_eq!(io.iter().filter(|t| t.does_io()).count(), 6);

        let nice = generate(WorkloadKind::ExtremeNice, 5, 1);
        assert_eq!(nice.iter().filter(|t| t.nice == -20).count(), 2);
        assert!(nice.iter().all(|t| t.burst_time == 2000));
    }

    #[test]
    fn batch_arrivals_are_staggered() {
        let batch = generate(WorkloadKind::Batch, 4, 3);
        let arrivals: Vec<_> = batch.iter().map(|t| t.arrival_time).collect();
        assert_eq!(arrivals, vec![0, 10, 20, 30]);
    }
}
