use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::workload::WorkloadKind;
use crate::{
    analysis::Metric,
    core::{Thread, Ticks},
    error::ConfigError,
    scheduler::PolicyKind,
};

/// Tick budget the catalog runs with unless the caller asks for another.
pub const BENCHMARK_MAX_TICKS: Ticks = 35_000;

const ALL_POLICIES: &[PolicyKind] = &PolicyKind::ALL;
const DYNAMIC_POLICIES: &[PolicyKind] = &[PolicyKind::FeedbackQueue, PolicyKind::WeightedFair];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    General,
    Application,
    Fairness,
    NiceEffect,
    Scalability,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::General,
        Category::Application,
        Category::Fairness,
        Category::NiceEffect,
        Category::Scalability,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Application => "application",
            Category::Fairness => "fairness",
            Category::NiceEffect => "nice_effect",
            Category::Scalability => "scalability",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::General => "common workload shapes, all three policies",
            Category::Application => "application patterns, all three policies",
            Category::Fairness => "CPU share fairness, mlfqs against cfs",
            Category::NiceEffect => "how far nice values move CPU time, mlfqs against cfs",
            Category::Scalability => "behaviour as the thread count grows, all three policies",
        }
    }

    pub fn benchmarks(self) -> impl Iterator<Item = &'static Benchmark> {
        BENCHMARKS.iter().filter(move |b| b.category == self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A goal-based comparison: which workload to generate, how many threads,
/// which policies to pit against each other and what decides the winner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Benchmark {
    pub id: &'static str,
    pub name: &'static str,
    pub goal: &'static str,
    pub category: Category,
    pub workload: WorkloadKind,
    pub threads: usize,
    pub policies: &'static [PolicyKind],
    pub metric: Metric,
    // Cap the run at this share of the total burst time
    #[serde(skip)]
    work_share: Option<f64>,
}

pub static BENCHMARKS: [Benchmark; 13] = [
    Benchmark {
        id: "general_mixed",
        name: "Mixed workload",
        goal: "overall performance on a general multitasking system",
        category: Category::General,
        workload: WorkloadKind::Mixed,
        threads: 50,
        policies: ALL_POLICIES,
        metric: Metric::AvgWait,
        work_share: None,
    },
    Benchmark {
        id: "general_cpu",
        name: "CPU-bound workload",
        goal: "throughput of pure computation",
        category: Category::General,
        workload: WorkloadKind::CpuBound,
        threads: 50,
        policies: ALL_POLICIES,
        metric: Metric::AvgTurnaround,
        work_share: None,
    },
    Benchmark {
        id: "general_io",
        name: "I/O-bound workload",
        goal: "responsiveness of interactive programs",
        category: Category::General,
        workload: WorkloadKind::IoBound,
        threads: 50,
        policies: ALL_POLICIES,
        metric: Metric::AvgWait,
        work_share: None,
    },
    Benchmark {
        id: "app_web",
        name: "Web server",
        goal: "many short requests mixed with a few long ones",
        category: Category::Application,
        workload: WorkloadKind::WebServer,
        threads: 50,
        policies: ALL_POLICIES,
        metric: Metric::AvgTurnaround,
        work_share: None,
    },
    Benchmark {
        id: "app_database",
        name: "Database",
        goal: "short queries interleaved with long transactions",
        category: Category::Application,
        workload: WorkloadKind::Database,
        threads: 50,
        policies: ALL_POLICIES,
        metric: Metric::AvgTurnaround,
        work_share: None,
    },
    Benchmark {
        id: "app_batch",
        name: "Batch processing",
        goal: "throughput of long jobs arriving in sequence",
        category: Category::Application,
        workload: WorkloadKind::Batch,
        threads: 50,
        policies: ALL_POLICIES,
        metric: Metric::AvgTurnaround,
        work_share: None,
    },
    Benchmark {
        id: "app_gaming",
        name: "Game loop",
        goal: "frame work arriving every 16 ticks next to AI and physics",
        category: Category::Application,
        workload: WorkloadKind::Gaming,
        threads: 50,
        policies: ALL_POLICIES,
        metric: Metric::AvgWait,
        work_share: None,
    },
    Benchmark {
        id: "fairness_cpu",
        name: "Fairness: CPU-bound",
        goal: "equal CPU share for identical threads",
        category: Category::Fairness,
        workload: WorkloadKind::CpuBound,
        threads: 50,
        policies: DYNAMIC_POLICIES,
        metric: Metric::Fairness,
        work_share: Some(0.5),
    },
    Benchmark {
        id: "fairness_mixed",
        name: "Fairness: mixed",
        goal: "fair shares across CPU and I/O heavy threads",
        category: Category::Fairness,
        workload: WorkloadKind::Mixed,
        threads: 50,
        policies: DYNAMIC_POLICIES,
        metric: Metric::Fairness,
        work_share: Some(0.5),
    },
    Benchmark {
        id: "nice_effect",
        name: "Nice effect",
        goal: "CPU time gap between nice -20 and nice 19",
        category: Category::NiceEffect,
        workload: WorkloadKind::ExtremeNice,
        threads: 50,
        policies: DYNAMIC_POLICIES,
        metric: Metric::CpuTimeRatio,
        work_share: Some(0.2),
    },
    Benchmark {
        id: "scalability_10",
        name: "Scalability: 10 threads",
        goal: "scheduling overhead with few threads",
        category: Category::Scalability,
        workload: WorkloadKind::Mixed,
        threads: 10,
        policies: ALL_POLICIES,
        metric: Metric::ContextSwitches,
        work_share: None,
    },
    Benchmark {
        id: "scalability_100",
        name: "Scalability: 100 threads",
        goal: "behaviour under heavy load",
        category: Category::Scalability,
        workload: WorkloadKind::Mixed,
        threads: 100,
        policies: ALL_POLICIES,
        metric: Metric::AvgWait,
        work_share: None,
    },
    Benchmark {
        id: "scalability_500",
        name: "Scalability: 500 threads",
        goal: "stability under extreme load",
        category: Category::Scalability,
        workload: WorkloadKind::Mixed,
        threads: 500,
        policies: ALL_POLICIES,
        metric: Metric::AvgWait,
        work_share: None,
    },
];

impl Benchmark {
    pub fn by_id(id: &str) -> Result<&'static Benchmark, ConfigError> {
        let wanted = id.trim().to_ascii_lowercase();
        BENCHMARKS
            .iter()
            .find(|b| b.id == wanted)
            .ok_or_else(|| ConfigError::UnknownBenchmark(id.to_owned()))
    }

    /// Tick budget for a run over `threads`, never above `max_ticks`.
    ///
    /// Fairness and nice benchmarks stop early, while every thread is still
    /// competing, since that is where CPU shares differ.
    pub fn tick_budget(&self, threads: &[Thread], max_ticks: Ticks) -> Ticks {
        match self.work_share {
            Some(share) => {
                let total: Ticks = threads.iter().map(|t| t.burst_time).sum();
                max_ticks.min((total as f64 * share) as Ticks)
            }
            None => max_ticks,
        }
    }
}

impl fmt::Display for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

impl FromStr for Benchmark {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Benchmark::by_id(s).copied()
    }
}
