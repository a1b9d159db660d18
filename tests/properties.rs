use std::collections::BTreeMap;

use proptest::prelude::*;
use schedsim::{
    PolicyKind, SimConfig, SimOutcome, Simulator,
    core::{NICE_MAX, NICE_MIN, PRI_MAX, Thread, ThreadStatus},
    scheduler::{FeedbackQueue, WeightedFair},
};

fn thread_strategy() -> impl Strategy<Value = (i32, u64, u64, u64, u64)> {
    (
        NICE_MIN..=NICE_MAX,
        0u64..50,
        1u64..60,
        prop_oneof![Just(0u64), 1u64..20],
        0u64..30,
    )
}

fn workload_strategy() -> impl Strategy<Value = Vec<Thread>> {
    prop::collection::vec(thread_strategy(), 1..8).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (nice, arrival, burst, io_freq, io_dur))| {
                Thread::new(i as u32 + 1, format!("p{i}"), nice, arrival, burst)
                    .with_io(io_freq, io_dur)
            })
            .collect()
    })
}

fn policy_strategy() -> impl Strategy<Value = PolicyKind> {
    prop::sample::select(PolicyKind::ALL.to_vec())
}

fn run(kind: PolicyKind, threads: Vec<Thread>) -> SimOutcome {
    Simulator::new(kind.build(), threads, SimConfig::default())
        .unwrap()
        .run()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn at_most_one_thread_runs_per_tick(threads in workload_strategy(), kind in policy_strategy()) {
        let outcome = run(kind, threads);
        let mut running: BTreeMap<u64, usize> = BTreeMap::new();
        for snapshot in &outcome.history {
            if snapshot.status == ThreadStatus::Running {
                *running.entry(snapshot.tick).or_default() += 1;
            }
        }
        prop_assert!(running.values().all(|&n| n == 1));
    }

    #[test]
    fn finished_threads_ran_exactly_their_burst(
        threads in workload_strategy(),
        kind in policy_strategy()
    ) {
        let outcome = run(kind, threads);
        prop_assert!(outcome.all_finished());
        for thread in &outcome.threads {
            prop_assert_eq!(thread.cpu_time(), thread.burst_time);
            prop_assert_eq!(outcome.running_ticks(thread.id) as u64, thread.burst_time);
            let start = thread.start_time.unwrap();
            let finish = thread.finish_time.unwrap();
            prop_assert!(thread.arrival_time <= start && start <= finish);
        }
    }

    #[test]
    fn wait_time_grows_only_while_ready(threads in workload_strategy(), kind in policy_strategy()) {
        let outcome = run(kind, threads);
        let mut last: BTreeMap<u32, u64> = BTreeMap::new();
        for snapshot in &outcome.history {
            let Some(previous) = last.insert(snapshot.id, snapshot.wait_time) else {
                continue;
            };
            let expected = u64::from(snapshot.status == ThreadStatus::Ready);
            prop_assert_eq!(
                snapshot.wait_time,
                previous + expected,
                "thread {} at tick {} is {:?}",
                snapshot.id,
                snapshot.tick,
                snapshot.status
            );
        }
    }

    #[test]
    fn feedback_priorities_stay_in_range(threads in workload_strategy()) {
        let mut sim = Simulator::new(FeedbackQueue::new(), threads, SimConfig::default()).unwrap();
        while !sim.all_threads_completed() {
            sim.step();
            for (_, thread) in sim.core.threads.iter() {
                if thread.status != ThreadStatus::Blocked {
                    prop_assert!(thread.priority.is_some_and(|p| p <= PRI_MAX));
                }
            }
        }
    }

    #[test]
    fn fair_watermark_is_monotonic(threads in workload_strategy()) {
        let mut sim = Simulator::new(WeightedFair::new(), threads, SimConfig::default()).unwrap();
        let mut watermark = sim.core.scheduler.min_vruntime();
        while !sim.all_threads_completed() {
            sim.step();
            let now = sim.core.scheduler.min_vruntime();
            prop_assert!(now >= watermark);
            watermark = now;
        }
    }

    #[test]
    fn runs_are_deterministic(threads in workload_strategy(), kind in policy_strategy()) {
        let a = run(kind, threads.clone());
        let b = run(kind, threads);
        prop_assert_eq!(a.history, b.history);
        prop_assert_eq!(a.context_switches, b.context_switches);
        prop_assert_eq!(a.ticks, b.ticks);
    }
}
