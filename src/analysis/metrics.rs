use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use average::{Estimate, Mean, Variance};
use serde::Serialize;

use crate::{
    core::{Nice, Thread, Ticks},
    error::ConfigError,
    scheduler::cfs::nice_to_weight,
    sim::SimOutcome,
};

// Starvation: fairness below this and max wait above factor x mean wait
pub const STARVATION_FAIRNESS: f64 = 0.85;
pub const STARVATION_WAIT_FACTOR: f64 = 15.0;

/// Per-run summary numbers, computed from final thread records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerMetrics {
    pub policy: &'static str,
    pub avg_wait: f64,
    pub avg_turnaround: Option<f64>,
    pub avg_response: Option<f64>,
    /// Finished threads per tick, from first arrival to last finish.
    pub throughput: f64,
    // percent
    pub cv_wait: f64,
    pub p99_wait: f64,
    pub worst_ratio: f64,
    /// Jain's index over CPU share relative to weighted entitlement.
    pub fairness: f64,
    /// Percentage of threads that never ran.
    pub starvation_pct: f64,
    pub has_starvation: bool,
    /// CPU time of the lowest-nice group over the highest-nice group.
    pub cpu_time_ratio: Option<f64>,
    pub context_switches: u64,
}

impl SchedulerMetrics {
    pub fn from_outcome(outcome: &SimOutcome) -> Self {
        let threads = &outcome.threads;
        let waits: Vec<f64> = threads.iter().map(|t| t.wait_time as f64).collect();

        let avg_wait = mean(&waits).unwrap_or(0.0);
        let max_wait = waits.iter().copied().fold(0.0, f64::max);

        let cv_wait = if avg_wait > 0.0 {
            let spread: Variance = waits.iter().copied().collect();
            spread.population_variance().sqrt() / avg_wait * 100.0
        } else {
            0.0
        };
        let worst_ratio = if avg_wait > 0.0 {
            max_wait / avg_wait
        } else {
            0.0
        };

        let starved = threads.iter().filter(|t| t.cpu_time() == 0).count();
        let starvation_pct = if threads.is_empty() {
            0.0
        } else {
            starved as f64 / threads.len() as f64 * 100.0
        };

        let fairness = round_to(weighted_fairness(threads), 4);
        let has_starvation = fairness < STARVATION_FAIRNESS
            && avg_wait > 0.0
            && max_wait > avg_wait * STARVATION_WAIT_FACTOR;

        Self {
            policy: outcome.policy,
            avg_wait,
            avg_turnaround: avg_of(threads.iter().filter_map(Thread::turnaround)),
            avg_response: avg_of(threads.iter().filter_map(Thread::response)),
            throughput: throughput(threads),
            cv_wait,
            p99_wait: percentile(&waits, 99.0),
            worst_ratio,
            fairness,
            starvation_pct,
            has_starvation,
            cpu_time_ratio: cpu_time_ratio(threads),
            context_switches: outcome.context_switches,
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::AvgWait => Some(self.avg_wait),
            Metric::AvgTurnaround => self.avg_turnaround,
            Metric::AvgResponse => self.avg_response,
            Metric::Throughput => Some(self.throughput),
            Metric::CvWait => Some(self.cv_wait),
            Metric::P99Wait => Some(self.p99_wait),
            Metric::WorstRatio => Some(self.worst_ratio),
            Metric::Fairness => Some(self.fairness),
            Metric::StarvationPct => Some(self.starvation_pct),
            Metric::CpuTimeRatio => self.cpu_time_ratio,
            Metric::ContextSwitches => Some(self.context_switches as f64),
        }
    }
}

/// Metrics a comparison report can rank runs by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    AvgWait,
    AvgTurnaround,
    AvgResponse,
    Throughput,
    CvWait,
    P99Wait,
    WorstRatio,
    Fairness,
    StarvationPct,
    CpuTimeRatio,
    ContextSwitches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
    /// Ranked by starvation first, then by the value itself.
    NiceEffect,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::AvgWait,
        Metric::AvgTurnaround,
        Metric::AvgResponse,
        Metric::Throughput,
        Metric::CvWait,
        Metric::P99Wait,
        Metric::WorstRatio,
        Metric::Fairness,
        Metric::StarvationPct,
        Metric::CpuTimeRatio,
        Metric::ContextSwitches,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::AvgWait => "avg_wait",
            Metric::AvgTurnaround => "avg_turnaround",
            Metric::AvgResponse => "avg_response",
            Metric::Throughput => "throughput",
            Metric::CvWait => "cv_wait",
            Metric::P99Wait => "p99_wait",
            Metric::WorstRatio => "worst_ratio",
            Metric::Fairness => "fairness",
            Metric::StarvationPct => "starvation_pct",
            Metric::CpuTimeRatio => "cpu_time_ratio",
            Metric::ContextSwitches => "context_switches",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Metric::Fairness | Metric::Throughput => Direction::HigherIsBetter,
            Metric::CpuTimeRatio => Direction::NiceEffect,
            _ => Direction::LowerIsBetter,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Metric::ALL
            .into_iter()
            .find(|metric| metric.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownMetric(s.to_owned()))
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().copied().collect::<Mean>().estimate())
}

fn avg_of(ticks: impl Iterator<Item = Ticks>) -> Option<f64> {
    let mean: Mean = ticks.map(|t| t as f64).collect();
    (!mean.is_empty()).then(|| mean.mean())
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn throughput(threads: &[Thread]) -> f64 {
    let Some(last_finish) = threads.iter().filter_map(|t| t.finish_time).max() else {
        return 0.0;
    };
    let first_arrival = threads.iter().map(|t| t.arrival_time).min().unwrap_or(0);
    let span = last_finish.saturating_sub(first_arrival);
    if span == 0 {
        return 0.0;
    }
    let finished = threads.iter().filter(|t| t.finish_time.is_some()).count();
    finished as f64 / span as f64
}

// Entitlement is runnable time times nice weight. Never-runnable threads are skipped.
fn weighted_fairness(threads: &[Thread]) -> f64 {
    let (cpu, entitled): (Vec<f64>, Vec<f64>) = threads
        .iter()
        .filter(|t| t.burst_time > 0 && t.runnable_time > 0)
        .map(|t| {
            let weight = nice_to_weight(t.nice) as f64;
            (t.cpu_time() as f64, t.runnable_time as f64 * weight)
        })
        .unzip();

    let total_cpu: f64 = cpu.iter().sum();
    let total_entitled: f64 = entitled.iter().sum();
    if total_cpu <= 0.0 || total_entitled <= 0.0 {
        return 0.0;
    }

    let shares: Vec<f64> = cpu
        .iter()
        .zip(&entitled)
        .map(|(c, e)| (c / total_cpu) / (e / total_entitled))
        .collect();
    jains_index(&shares)
}

fn cpu_time_ratio(threads: &[Thread]) -> Option<f64> {
    let mut by_nice: BTreeMap<Nice, Ticks> = BTreeMap::new();
    for thread in threads {
        *by_nice.entry(thread.nice).or_default() += thread.cpu_time();
    }
    if by_nice.len() < 2 {
        return None;
    }

    let (_, &favoured) = by_nice.first_key_value()?;
    let (_, &penalised) = by_nice.last_key_value()?;
    let ratio = match (favoured, penalised) {
        (0, 0) => 1.0,
        (favoured, 0) => favoured as f64,
        (favoured, penalised) => favoured as f64 / penalised as f64,
    };
    Some(ratio)
}

/// Jain's fairness index. Zero for an empty or all-zero input.
pub fn jains_index(values: &[f64]) -> f64 {
    let sum: f64 = values.iter().sum();
    let sum_sq: f64 = values.iter().map(|x| x * x).sum();
    if values.is_empty() || sum_sq == 0.0 {
        return 0.0;
    }
    sum * sum / (values.len() as f64 * sum_sq)
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Effect size of `a` over `b`, using the pooled sample standard deviation.
pub fn cohens_d(a: &[f64], b: &[f64]) -> f64 {
    let a: Variance = a.iter().copied().collect();
    let b: Variance = b.iter().copied().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let pooled = ((a.sample_variance() + b.sample_variance()) / 2.0).sqrt();
    if pooled == 0.0 || !pooled.is_finite() {
        return 0.0;
    }
    (a.mean() - b.mean()) / pooled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(id: u32, nice: Nice, arrival: Ticks, burst: Ticks, wait: Ticks) -> Thread {
        let mut thread = Thread::new(id, format!("t{id}"), nice, arrival, burst);
        thread.remaining_time = 0;
        thread.wait_time = wait;
        thread.runnable_time = wait + burst;
        thread.start_time = Some(arrival + wait);
        thread.finish_time = Some(arrival + wait + burst - 1);
        thread
    }

    fn outcome(threads: Vec<Thread>) -> SimOutcome {
        SimOutcome {
            policy: "basic",
            threads,
            history: Vec::new(),
            context_switches: 3,
            ticks: 100,
            busy_ticks: 100,
        }
    }

    #[test]
    fn jain_bounds() {
        assert_eq!(jains_index(&[]), 0.0);
        assert_eq!(jains_index(&[0.0, 0.0]), 0.0);
        assert!((jains_index(&[2.0, 2.0, 2.0]) - 1.0).abs() < 1e-12);
        assert!((jains_index(&[1.0, 0.0, 0.0, 0.0]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert!((percentile(&values, 99.0) - 4.96).abs() < 1e-9);
        assert_eq!(percentile(&[], 99.0), 0.0);
    }

    #[test]
    fn cohens_d_uses_pooled_sample_std() {
        let d = cohens_d(&[2.0, 4.0], &[0.0, 2.0]);
        // both sample variances are 2
        assert!((d - 2.0 / 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(cohens_d(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn averages_and_throughput() {
        let metrics = SchedulerMetrics::from_outcome(&outcome(vec![
            finished(1, 0, 0, 10, 0),
            finished(2, 0, 0, 10, 10),
        ]));
        assert_eq!(metrics.avg_wait, 5.0);
        // turnarounds 9 and 19
        assert_eq!(metrics.avg_turnaround, Some(14.0));
        assert_eq!(metrics.avg_response, Some(5.0));
        assert!((metrics.throughput - 2.0 / 19.0).abs() < 1e-12);
        assert_eq!(metrics.cv_wait, 100.0);
        assert_eq!(metrics.worst_ratio, 2.0);
        assert_eq!(metrics.starvation_pct, 0.0);
        assert_eq!(metrics.cpu_time_ratio, None);
        assert_eq!(metrics.context_switches, 3);
    }

    #[test]
    fn unfinished_threads_leave_turnaround_empty() {
        let mut waiting = Thread::new(1, "w", 0, 0, 10);
        waiting.wait_time = 40;
        waiting.runnable_time = 40;
        let metrics = SchedulerMetrics::from_outcome(&outcome(vec![waiting]));
        assert_eq!(metrics.avg_turnaround, None);
        assert_eq!(metrics.avg_response, None);
        assert_eq!(metrics.throughput, 0.0);
        assert_eq!(metrics.starvation_pct, 100.0);
        assert_eq!(metrics.fairness, 0.0);
    }

    #[test]
    fn weighted_share_is_fair_across_nice() {
        // Both runnable for 1000 ticks; CPU split in proportion to weight
        let mut heavy = Thread::new(1, "heavy", -5, 0, 100_000);
        let mut light = Thread::new(2, "light", 0, 0, 100_000);
        heavy.runnable_time = 1000;
        light.runnable_time = 1000;
        heavy.remaining_time -= 3121 * 10;
        light.remaining_time -= 1024 * 10;
        let metrics = SchedulerMetrics::from_outcome(&outcome(vec![heavy, light]));
        assert_eq!(metrics.fairness, 1.0);

        let ratio = metrics.cpu_time_ratio.unwrap();
        assert!((ratio - 3121.0 / 1024.0).abs() < 1e-9);
    }

    #[test]
    fn cpu_time_ratio_fallbacks() {
        let mut fav = Thread::new(1, "fav", -20, 0, 100);
        let never = Thread::new(2, "never", 19, 0, 100);
        fav.remaining_time = 60;
        assert_eq!(cpu_time_ratio(&[fav, never.clone()]), Some(40.0));

        let idle = Thread::new(1, "idle", -20, 0, 100);
        assert_eq!(cpu_time_ratio(&[idle, never]), Some(1.0));
    }

    #[test]
    fn metric_names_parse() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>(), Ok(metric));
        }
        assert_eq!(
            "latency".parse::<Metric>(),
            Err(ConfigError::UnknownMetric("latency".into()))
        );
        assert_eq!(Metric::Fairness.direction(), Direction::HigherIsBetter);
        assert_eq!(Metric::P99Wait.direction(), Direction::LowerIsBetter);
    }
}
