use std::error::Error;

use average::Estimate;
use clap::Parser;
use log::info;
use schedsim::{
    ComparisonReport, Metric, PolicyKind, SimConfig, SimOutcome, WorkloadKind,
    config::{DEFAULT_MAX_TICKS, DEFAULT_TIME_SLICE},
    scheduler::{AnyScheduler, StaticPriority},
    sim::{
        Benchmark, Category, compare_schedulers,
        benchmark::BENCHMARK_MAX_TICKS,
        workload,
    },
};

/// Run one workload under several scheduling policies and compare them.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Workload recipe: mixed, cpu_bound, io_bound, web_server, database,
    /// batch, gaming, extreme_nice, extreme_nice_fairness
    #[arg(short, long, default_value = "mixed")]
    workload: WorkloadKind,

    #[arg(short = 'n', long, default_value_t = workload::DEFAULT_THREAD_COUNT)]
    threads: usize,

    #[arg(short, long, default_value_t = workload::DEFAULT_SEED)]
    seed: u64,

    /// Tick budget [default: 10000, or 35000 with --benchmark]
    #[arg(long)]
    max_ticks: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_TIME_SLICE)]
    time_slice: u32,

    /// Policies to run (basic, mlfqs, cfs); repeat for several. All by default.
    #[arg(short, long = "policy")]
    policies: Vec<PolicyKind>,

    /// Metric that picks the winner
    #[arg(short, long, default_value = "avg_wait")]
    metric: Metric,

    /// Run a catalogued benchmark; sets workload, threads, policies and metric
    #[arg(short, long, conflicts_with_all = ["workload", "threads", "policies", "metric"])]
    benchmark: Option<Benchmark>,

    /// List the benchmark catalog and exit
    #[arg(long)]
    list_benchmarks: bool,

    /// Age long-waiting threads under the static-priority policy
    #[arg(long)]
    aging: bool,

    /// Print the comparison report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    if args.list_benchmarks {
        print_catalog();
        return Ok(());
    }

    let (kind, count, mut policies, metric) = match args.benchmark {
        Some(bench) => {
            info!("benchmark {}: {}", bench.id, bench.goal);
            (bench.workload, bench.threads, bench.policies.to_vec(), bench.metric)
        }
        None => (args.workload, args.threads, args.policies.clone(), args.metric),
    };
    if policies.is_empty() {
        policies = PolicyKind::ALL.to_vec();
    }

    let threads = workload::generate(kind, count, args.seed);
    info!(
        "workload {kind} with {} threads (seed {})",
        threads.len(),
        args.seed
    );

    let max_ticks = match args.benchmark {
        Some(bench) => {
            bench.tick_budget(&threads, args.max_ticks.unwrap_or(BENCHMARK_MAX_TICKS))
        }
        None => args.max_ticks.unwrap_or(DEFAULT_MAX_TICKS),
    };
    let config = SimConfig::new(args.time_slice, max_ticks).without_trace();
    config.validate()?;

    let schedulers = policies
        .iter()
        .map(|&kind| match kind {
            PolicyKind::StaticPriority if args.aging => {
                AnyScheduler::from(StaticPriority::with_aging())
            }
            kind => kind.build(),
        })
        .collect();

    let outcomes = compare_schedulers(&threads, schedulers, config)?;
    let Some(report) = ComparisonReport::build(&outcomes, metric) else {
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for outcome in &outcomes {
        print_outcome(outcome);
    }
    print_report(&report);
    Ok(())
}

fn print_catalog() {
    for category in Category::ALL {
        println!("{category}: {}", category.description());
        for bench in category.benchmarks() {
            let policies: Vec<_> = bench.policies.iter().map(|p| p.as_str()).collect();
            println!(
                "  {:<16} {} ({} x{}, {}, by {})",
                bench.id,
                bench.name,
                bench.workload,
                bench.threads,
                policies.join("/"),
                bench.metric
            );
        }
    }
}

fn print_outcome(outcome: &SimOutcome) {
    let response_times = outcome
        .threads
        .iter()
        .filter_map(|t| t.response())
        .map(|r| r as f64);
    let turnaround_times = outcome.finished().filter_map(|t| t.turnaround()).map(|t| t as f64);

    println!("== {} ==", outcome.policy);
    println!(
        "  finished {}/{} threads in {} ticks ({} idle)",
        outcome.finished().count(),
        outcome.threads.len(),
        outcome.ticks,
        outcome.ticks - outcome.busy_ticks
    );
    println!("  Average response time: {:.2} ticks", avg(response_times));
    println!("  Average turnaround time: {:.2} ticks", avg(turnaround_times));
    println!("  Context switches: {}", outcome.context_switches);
}

fn print_report(report: &ComparisonReport) {
    println!();
    println!("Primary metric: {}", report.primary_metric);
    for metrics in &report.metrics {
        let value = metrics
            .value(report.primary_metric)
            .map_or_else(|| "n/a".to_owned(), |v| format!("{v:.4}"));
        let starving = if metrics.has_starvation {
            " (starvation)"
        } else {
            ""
        };
        println!(
            "  {:>6}: {value}  fairness {:.4}{starving}",
            metrics.policy, metrics.fairness
        );
    }
    for improvement in &report.improvements {
        let unit = if improvement.relative { "%" } else { "" };
        println!(
            "  {} vs {}: {:+.2}{unit}",
            improvement.policy, report.baseline, improvement.value
        );
    }
    println!("Winner: {}", report.winner);
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    iter.collect::<average::Mean>().estimate()
}
