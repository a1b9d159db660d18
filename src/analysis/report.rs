use std::cmp::Ordering;

use serde::Serialize;

use super::metrics::{Direction, Metric, SchedulerMetrics};
use crate::{scheduler::PolicyKind, sim::SimOutcome};

/// Runs starving at least this share of their threads cannot win.
pub const STARVATION_DISQUALIFY_PCT: f64 = 10.0;

/// Change of one run against the baseline on the primary metric.
///
/// Positive is better. `value` is a percentage when `relative` is set, and an
/// absolute delta when the baseline is too close to zero to divide by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Improvement {
    pub policy: &'static str,
    pub value: f64,
    pub relative: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub primary_metric: Metric,
    pub baseline: &'static str,
    pub winner: &'static str,
    /// One entry per run, in input order.
    pub metrics: Vec<SchedulerMetrics>,
    pub improvements: Vec<Improvement>,
}

impl ComparisonReport {
    /// `None` when there are no runs to compare.
    pub fn build(results: &[SimOutcome], primary: Metric) -> Option<Self> {
        let metrics: Vec<SchedulerMetrics> =
            results.iter().map(SchedulerMetrics::from_outcome).collect();

        let baseline = pick_baseline(&metrics)?;
        let improvements = improvements_over(&metrics, baseline, primary);
        let winner = pick_winner(&metrics, primary)?;

        Some(Self {
            primary_metric: primary,
            baseline: baseline.policy,
            winner: winner.policy,
            improvements,
            metrics,
        })
    }

    pub fn metrics_for(&self, policy: &str) -> Option<&SchedulerMetrics> {
        self.metrics.iter().find(|m| m.policy == policy)
    }
}

// The static-priority run if there is one, else the alphabetically first.
fn pick_baseline(metrics: &[SchedulerMetrics]) -> Option<&SchedulerMetrics> {
    let basic = PolicyKind::StaticPriority.as_str();
    metrics
        .iter()
        .find(|m| m.policy == basic)
        .or_else(|| metrics.iter().min_by_key(|m| m.policy))
}

fn improvements_over(
    metrics: &[SchedulerMetrics],
    baseline: &SchedulerMetrics,
    primary: Metric,
) -> Vec<Improvement> {
    let Some(base) = baseline.value(primary) else {
        return Vec::new();
    };

    metrics
        .iter()
        .filter(|m| m.policy != baseline.policy)
        .filter_map(|m| {
            let current = m.value(primary)?;
            let (value, relative) = match primary.direction() {
                Direction::LowerIsBetter if base > 1.0 => {
                    ((base - current) / base * 100.0, true)
                }
                Direction::LowerIsBetter => (base - current, false),
                Direction::HigherIsBetter if base > 0.01 => {
                    ((current - base) / base * 100.0, true)
                }
                Direction::HigherIsBetter => (current - base, false),
                Direction::NiceEffect => (0.0, false),
            };
            Some(Improvement {
                policy: m.policy,
                value,
                relative,
            })
        })
        .collect()
}

fn pick_winner(metrics: &[SchedulerMetrics], primary: Metric) -> Option<&SchedulerMetrics> {
    let eligible: Vec<&SchedulerMetrics> = metrics
        .iter()
        .filter(|m| m.starvation_pct < STARVATION_DISQUALIFY_PCT)
        .collect();
    let candidates = if eligible.is_empty() {
        metrics.iter().collect()
    } else {
        eligible
    };

    match primary.direction() {
        Direction::LowerIsBetter => first_best(&candidates, |a, b| {
            let key = |m: &SchedulerMetrics| m.value(primary).unwrap_or(f64::INFINITY);
            key(a).total_cmp(&key(b))
        }),
        Direction::HigherIsBetter => first_best(&candidates, |a, b| {
            let key = |m: &SchedulerMetrics| m.value(primary).unwrap_or(f64::NEG_INFINITY);
            key(b).total_cmp(&key(a))
        }),
        Direction::NiceEffect => first_best(&candidates, |a, b| {
            let ratio = |m: &SchedulerMetrics| m.cpu_time_ratio.unwrap_or(0.0);
            a.starvation_pct
                .total_cmp(&b.starvation_pct)
                .then_with(|| ratio(b).total_cmp(&ratio(a)))
        }),
    }
}

// min_by keeps the first of equal elements, so ties go to input order
fn first_best<'a>(
    candidates: &[&'a SchedulerMetrics],
    cmp: impl Fn(&SchedulerMetrics, &SchedulerMetrics) -> Ordering,
) -> Option<&'a SchedulerMetrics> {
    candidates.iter().copied().min_by(|a, b| cmp(a, b))
}
