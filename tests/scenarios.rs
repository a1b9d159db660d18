use schedsim::{
    ConfigError, Metric, PolicyKind, SimConfig, Simulator, WorkloadKind, compare,
    core::{SimEvent, Thread, ThreadStatus},
    scheduler::{StaticPriority, WeightedFair},
    sim::{Benchmark, benchmark::BENCHMARK_MAX_TICKS, workload},
};

fn run(kind: PolicyKind, threads: Vec<Thread>, config: SimConfig) -> schedsim::SimOutcome {
    Simulator::new(kind.build(), threads, config).unwrap().run()
}

#[test]
fn lone_thread_runs_to_completion_without_waiting() {
    for kind in PolicyKind::ALL {
        let outcome = run(kind, vec![Thread::new(1, "solo", 0, 0, 10)], SimConfig::default());
        let thread = outcome.thread(1).unwrap();

        assert_eq!(thread.status, ThreadStatus::Terminated, "{kind}");
        assert_eq!(thread.start_time, Some(0), "{kind}");
        assert_eq!(thread.finish_time, Some(9), "{kind}");
        assert_eq!(thread.wait_time, 0, "{kind}");
        assert_eq!(thread.remaining_time, 0, "{kind}");
        assert_eq!(outcome.context_switches, 0, "{kind}");
    }
}

#[test]
fn io_blocks_for_clamped_duration() {
    // 5 ticks of I/O is clamped up to 8
    let thread = Thread::new(1, "io", 0, 0, 100).with_io(10, 5);
    for kind in PolicyKind::ALL {
        let outcome = run(kind, vec![thread.clone()], SimConfig::default());

        let blocked: Vec<u64> = outcome
            .trace_of(1)
            .filter(|s| s.status == ThreadStatus::Blocked)
            .map(|s| s.tick)
            .take(8)
            .collect();
        assert_eq!(blocked, (10..=17).collect::<Vec<_>>(), "{kind}");

        let at_18 = outcome.trace_of(1).find(|s| s.tick == 18).unwrap();
        assert_eq!(at_18.status, ThreadStatus::Running, "{kind}");
        assert!(outcome.all_finished(), "{kind}");
    }
}

#[test]
fn static_priority_picks_highest_then_fifo() {
    let threads = [10, 30, 30, 5]
        .into_iter()
        .enumerate()
        .map(|(i, pri)| Thread::new(i as u32 + 1, "t", 0, 0, 20).with_priority(pri))
        .collect();
    let mut sim = Simulator::new(StaticPriority::new(), threads, SimConfig::default()).unwrap();

    let mut dispatched = Vec::new();
    while !sim.all_threads_completed() {
        for event in sim.step() {
            if let SimEvent::Dispatched { to, .. } = event {
                dispatched.push(to);
            }
        }
    }

    // Five 4-tick slices each: the two 30s alternate, then 10 runs alone, then 5
    let mut expected: Vec<u32> = [2, 3].repeat(5);
    expected.extend([1; 5]);
    expected.extend([4; 5]);
    assert_eq!(dispatched, expected);
}

#[test]
fn weighted_fair_honours_nice() {
    let threads = vec![
        Thread::new(1, "favoured", -20, 0, 2000),
        Thread::new(2, "penalised", 19, 0, 2000),
    ];
    let config = SimConfig::default().with_max_ticks(20_000);
    let outcome = Simulator::new(WeightedFair::new(), threads, config)
        .unwrap()
        .run();
    assert!(outcome.all_finished());

    // Count CPU ticks only while both threads were still alive
    let contended_until = outcome.finished().filter_map(|t| t.finish_time).min().unwrap();
    let running_while_contended = |id: u32| {
        outcome
            .trace_of(id)
            .filter(|s| s.status == ThreadStatus::Running && s.tick <= contended_until)
            .count()
    };
    let favoured = running_while_contended(1);
    let penalised = running_while_contended(2);
    assert!(
        favoured > 100 * penalised.max(1),
        "favoured {favoured} vs penalised {penalised}"
    );
}

#[test]
fn same_input_same_history() {
    let threads = workload::generate(WorkloadKind::Mixed, 8, 7);
    for kind in PolicyKind::ALL {
        let a = run(kind, threads.clone(), SimConfig::default());
        let b = run(kind, threads.clone(), SimConfig::default());
        assert_eq!(a.history, b.history, "{kind}");
        assert_eq!(a.context_switches, b.context_switches, "{kind}");
    }
}

#[test]
fn compared_runs_do_not_share_state() {
    let threads = workload::generate(WorkloadKind::Database, 10, 3);
    let before: Vec<_> = threads
        .iter()
        .map(|t| (t.id, t.status, t.remaining_time, t.wait_time))
        .collect();

    let outcomes = compare(&threads, &PolicyKind::ALL, SimConfig::default()).unwrap();
    let policies: Vec<_> = outcomes.iter().map(|o| o.policy).collect();
    assert_eq!(policies, vec!["basic", "mlfqs", "cfs"]);

    let after: Vec<_> = threads
        .iter()
        .map(|t| (t.id, t.status, t.remaining_time, t.wait_time))
        .collect();
    assert_eq!(before, after);

    // Each run matches a solo run of the same policy
    for (kind, outcome) in PolicyKind::ALL.into_iter().zip(&outcomes) {
        let solo = run(kind, threads.clone(), SimConfig::default());
        assert_eq!(solo.history, outcome.history, "{kind}");
    }
}

#[test]
fn context_switches_are_counted_per_run() {
    let threads = vec![Thread::new(1, "a", 0, 0, 12), Thread::new(2, "b", 0, 0, 12)];
    let mut sim = Simulator::new(StaticPriority::new(), threads, SimConfig::default()).unwrap();

    let mut switches = 0;
    while !sim.all_threads_completed() {
        switches += sim
            .step()
            .iter()
            .filter(|e| matches!(e, SimEvent::Dispatched { context_switch: true, .. }))
            .count() as u64;
    }
    assert!(switches > 0);
    assert_eq!(sim.core.context_switches(), switches);
}

#[test]
fn unknown_identifiers_are_rejected() {
    assert_eq!(
        "round_robin".parse::<PolicyKind>(),
        Err(ConfigError::UnknownPolicy("round_robin".into()))
    );
    assert_eq!(
        "video".parse::<WorkloadKind>(),
        Err(ConfigError::UnknownWorkload("video".into()))
    );
    assert_eq!(
        "speed".parse::<Metric>(),
        Err(ConfigError::UnknownMetric("speed".into()))
    );
    assert_eq!(
        "latency_sweep".parse::<Benchmark>(),
        Err(ConfigError::UnknownBenchmark("latency_sweep".into()))
    );
}

#[test]
fn fairness_benchmark_compares_dynamic_policies() {
    let bench: Benchmark = "fairness_cpu".parse().unwrap();
    let threads = workload::generate(bench.workload, 8, workload::DEFAULT_SEED);
    let config = SimConfig::default()
        .with_max_ticks(bench.tick_budget(&threads, BENCHMARK_MAX_TICKS))
        .without_trace();

    let outcomes = compare(&threads, bench.policies, config).unwrap();
    let report = schedsim::ComparisonReport::build(&outcomes, bench.metric).unwrap();

    assert_eq!(report.baseline, "cfs");
    assert_eq!(report.metrics.len(), 2);
    for outcome in &outcomes {
        assert!(!outcome.all_finished(), "{}", outcome.policy);
        assert!(outcome.ticks <= config.max_ticks);
    }
}

#[test]
fn report_ranks_every_policy() {
    let threads = workload::generate(WorkloadKind::CpuBound, 6, 11);
    let outcomes = compare(&threads, &PolicyKind::ALL, SimConfig::default()).unwrap();
    let report = schedsim::ComparisonReport::build(&outcomes, Metric::Fairness).unwrap();

    assert_eq!(report.baseline, "basic");
    assert_eq!(report.metrics.len(), 3);
    assert_eq!(report.improvements.len(), 2);
    for metrics in &report.metrics {
        assert!((0.0..=1.0).contains(&metrics.fairness), "{}", metrics.policy);
    }
}
