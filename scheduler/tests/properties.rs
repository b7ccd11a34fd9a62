use std::collections::BTreeMap;
use std::num::NonZeroU32;

use proptest::prelude::*;
use scheduler::{
    build_scheduler, sync_demo, Algorithm, ProcessDescriptor, ProcessState, Scheduler, SimConfig,
    SimulationResult, SyncDemoConfig, Tick,
};

/// Alternating CPU and I/O bursts, starting and ending on the CPU
fn pattern() -> impl Strategy<Value = Vec<u32>> {
    (0usize..3).prop_flat_map(|io_bursts| prop::collection::vec(1u32..8, 2 * io_bursts + 1))
}

fn descriptor() -> impl Strategy<Value = (Tick, u32, Vec<u32>, u32, u32)> {
    (0u64..15, 0u32..7, pattern(), 0u32..20, 0u32..30)
}

fn workload() -> impl Strategy<Value = Vec<ProcessDescriptor>> {
    prop::collection::vec(descriptor(), 1..6).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(index, (arrival, priority, pattern, period, deadline))| {
                ProcessDescriptor::new(index as u32 + 1, arrival, priority, pattern)
                    .with_period(period)
                    .with_deadline(deadline)
            })
            .collect()
    })
}

/// Pids in the order they were put on the CPU, read back from the event log
fn dispatch_order(result: &SimulationResult) -> Vec<u32> {
    result
        .event_log
        .iter()
        .filter_map(|line| line.split("] P").nth(1))
        .filter_map(|rest| rest.strip_suffix(" → Running"))
        .filter_map(|pid| pid.parse().ok())
        .collect()
}

fn check_result(result: &SimulationResult, config: &SimConfig) -> Result<(), TestCaseError> {
    prop_assert!(!result.timed_out, "{} timed out", result.algorithm);

    let mut cpu_time: BTreeMap<u32, Tick> = BTreeMap::new();
    for entry in &result.gantt_chart {
        prop_assert!(entry.start < entry.end);

        if let (Some(pid), ProcessState::Running) = (entry.owner.pid(), entry.state) {
            *cpu_time.entry(pid.get()).or_default() += entry.duration();
        }
    }

    for proc in &result.processes {
        let demand = proc.total_cpu_demand();
        let finish = proc.finish_time().unwrap_or_default();

        prop_assert_eq!(proc.current_burst_index(), proc.execution_pattern().len());
        prop_assert_eq!(proc.turnaround_time(), finish - proc.arrival_time());
        prop_assert!(proc.turnaround_time() >= demand);
        prop_assert_eq!(proc.waiting_time(), proc.turnaround_time() - demand);
        prop_assert_eq!(cpu_time.get(&proc.pid().get()).copied().unwrap_or_default(), demand);
        prop_assert!(proc.response_time().is_some());
    }

    let order = dispatch_order(result);
    let transitions = order.windows(2).filter(|pair| pair[0] != pair[1]).count() as u64;
    prop_assert_eq!(result.statistics.context_switches, transitions);

    if config.context_switch_overhead > 0 {
        let billed = result
            .gantt_chart
            .iter()
            .filter(|entry| entry.state == ProcessState::ContextSwitching)
            .map(|entry| entry.duration())
            .sum::<Tick>();
        prop_assert_eq!(billed, transitions * Tick::from(config.context_switch_overhead));
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_policy_keeps_the_books(
        processes in workload(),
        overhead in 0u32..3,
        quantum in 1u32..6,
    ) {
        let config = SimConfig::default()
            .with_context_switch_overhead(overhead)
            .with_time_quantum(NonZeroU32::new(quantum).unwrap());

        for algorithm in Algorithm::POLICIES {
            let result = build_scheduler(algorithm, &processes, &config).run().unwrap();
            check_result(&result, &config)?;

            let expected = match algorithm {
                Algorithm::RateMonotonic => processes.iter().filter(|desc| desc.period > 0).count(),
                Algorithm::Edf => processes.iter().filter(|desc| desc.deadline > 0).count(),
                _ => processes.len(),
            };
            prop_assert_eq!(result.processes.len(), expected);
        }
    }

    #[test]
    fn burst_index_only_moves_forward(processes in workload(), overhead in 0u32..3) {
        let config = SimConfig::default().with_context_switch_overhead(overhead);
        let mut scheduler = build_scheduler(Algorithm::Mlq, &processes, &config);
        let mut seen: BTreeMap<u32, usize> = BTreeMap::new();

        loop {
            let done = scheduler.execute_one_step().unwrap();
            let snapshot = scheduler.get_current_snapshot();

            let visible = snapshot
                .running
                .into_iter()
                .chain(snapshot.ready.iter().copied())
                .chain(snapshot.waiting.iter().copied())
                .chain(snapshot.terminated.iter().copied());

            for proc in visible {
                let index = proc.current_burst_index();
                prop_assert!(index <= proc.execution_pattern().len());

                let last = seen.insert(proc.pid().get(), index).unwrap_or(0);
                prop_assert!(index >= last);
            }

            if done {
                break;
            }
        }
    }

    #[test]
    fn producer_and_consumer_always_finish(
        rounds in 1u32..7,
        buffer_size in 1u32..5,
        time_slice in 1u32..6,
        critical_section_ticks in 1u32..4,
        overhead in 0u32..3,
    ) {
        let demo = SyncDemoConfig {
            time_slice: NonZeroU32::new(time_slice).unwrap(),
            critical_section_ticks,
            ..SyncDemoConfig::default()
        }
        .with_rounds(rounds)
        .with_buffer_size(buffer_size);
        let config = SimConfig::default().with_context_switch_overhead(overhead);

        let processes = [
            ProcessDescriptor::new(1, 3, 2, vec![1]),
            ProcessDescriptor::new(2, 0, 8, vec![1]),
        ];
        let result = sync_demo(&processes, &demo, &config).run().unwrap();
        check_result(&result, &config)?;
        prop_assert_eq!(result.processes.len(), 2);
        prop_assert!(result.processes.iter().all(|proc| !proc.is_aborted()));

        let report = result.deadlock_report.unwrap_or_default();
        prop_assert_eq!(report.deadlocks_detected, 0);
        prop_assert_eq!(report.deadlock_checks, (result.total_time - 1) / demo.deadlock_check_interval + 1);
    }
}
