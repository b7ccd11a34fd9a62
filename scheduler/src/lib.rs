//! A CPU scheduling simulator library.
//!
//! This library provides a tick-driven engine, the classic scheduling
//! policies and a producer-consumer synchronization demo, together with
//! the traces and statistics needed to compare them.
//!

mod common_types;
pub use crate::common_types::{
    GanttEntry, GanttOwner, Pid, ProcessState, Tick, CONTEXT_SWITCH_SENTINEL, IDLE_SENTINEL,
};

mod error;
pub use crate::error::SimError;

mod config;
pub use crate::config::{SimConfig, SyncDemoConfig};

mod process_control_block;
pub use crate::process_control_block::{Process, ProcessDescriptor};

mod ready_queue;
pub use crate::ready_queue::{QueueSlot, ReadyQueues};

mod statistics;
pub use crate::statistics::{DeadlockReport, SchedulerStats, SimulationResult, Statistics};

mod collector;
pub use crate::collector::{collect_all, Collector, Snapshot};

mod scheduler;
pub use crate::scheduler::{PreemptReason, Requeue, Scheduler, SchedulingPolicy};

mod common_funcs;
pub use common_funcs::{beats_running, select_front, select_min_by_key};

mod engine;
pub use crate::engine::Simulation;

mod sync;
pub use crate::sync::{Mutex, Semaphore, SyncManager};

mod schedulers;
pub use schedulers::{
    level_after, quantum, Edf, Fcfs, LevelEvent, MultilevelQueue, PriorityAging, RateMonotonic,
    RoundRobin, Srtf, StaticPriority, SyncDemo, SyncPhase, SyncRole, MLQ_LEVELS,
};

/// Returns a first come, first served scheduler
///
/// * `processes` - the process set, copied into the run
/// * `config` - overhead and tick limit
pub fn fcfs(processes: &[ProcessDescriptor], config: &SimConfig) -> impl Scheduler {
    Simulation::new(Fcfs, processes, config)
}

/// Returns a preemptive shortest-remaining-time-first scheduler
pub fn srtf(processes: &[ProcessDescriptor], config: &SimConfig) -> impl Scheduler {
    Simulation::new(Srtf, processes, config)
}

/// Returns a round robin scheduler using `config.time_quantum`
///
/// * `processes` - the process set, copied into the run
/// * `config` - overhead, quantum and tick limit
pub fn round_robin(processes: &[ProcessDescriptor], config: &SimConfig) -> impl Scheduler {
    Simulation::new(RoundRobin::new(config.time_quantum), processes, config)
}

/// Returns a preemptive static priority scheduler, lower value meaning higher
/// priority
pub fn priority(processes: &[ProcessDescriptor], config: &SimConfig) -> impl Scheduler {
    Simulation::new(StaticPriority, processes, config)
}

/// Returns a preemptive priority scheduler where waiting processes gain one
/// priority level every `config.aging_factor` ticks spent in the ready queue
pub fn priority_aging(processes: &[ProcessDescriptor], config: &SimConfig) -> impl Scheduler {
    Simulation::new(PriorityAging::new(config.aging_factor), processes, config)
}

/// Returns a three level feedback queue scheduler
pub fn mlq(processes: &[ProcessDescriptor], config: &SimConfig) -> impl Scheduler {
    Simulation::new(MultilevelQueue, processes, config)
}

/// Returns a rate monotonic scheduler; processes without a period are left out
pub fn rate_monotonic(processes: &[ProcessDescriptor], config: &SimConfig) -> impl Scheduler {
    Simulation::new(RateMonotonic, processes, config)
}

/// Returns an earliest deadline first scheduler; processes without a deadline
/// are left out
pub fn edf(processes: &[ProcessDescriptor], config: &SimConfig) -> impl Scheduler {
    Simulation::new(Edf, processes, config)
}

/// Returns the producer-consumer demo
///
/// * `processes` - candidates for the producer and consumer roles
/// * `demo` - buffer, rounds and timings of the demo
/// * `config` - supplies the context switch overhead
pub fn sync_demo(processes: &[ProcessDescriptor], demo: &SyncDemoConfig, config: &SimConfig) -> impl Scheduler {
    SyncDemo::new(processes, demo, config)
}

/// The algorithms a front end can pick from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Fcfs,
    Srtf,
    RoundRobin,
    Priority,
    PriorityAging,
    Mlq,
    RateMonotonic,
    Edf,
    SyncDemo,
}

impl Algorithm {
    /// The policies compared by [`run_all`], in display order
    pub const POLICIES: [Algorithm; 8] = [
        Algorithm::Fcfs,
        Algorithm::Srtf,
        Algorithm::RoundRobin,
        Algorithm::Priority,
        Algorithm::PriorityAging,
        Algorithm::Mlq,
        Algorithm::RateMonotonic,
        Algorithm::Edf,
    ];
}

/// Builds the scheduler for `algorithm` over a private copy of `processes`
///
/// The sync demo runs with the default [`SyncDemoConfig`].
pub fn build_scheduler(
    algorithm: Algorithm,
    processes: &[ProcessDescriptor],
    config: &SimConfig,
) -> Box<dyn Scheduler> {
    match algorithm {
        Algorithm::Fcfs => Box::new(fcfs(processes, config)),
        Algorithm::Srtf => Box::new(srtf(processes, config)),
        Algorithm::RoundRobin => Box::new(round_robin(processes, config)),
        Algorithm::Priority => Box::new(priority(processes, config)),
        Algorithm::PriorityAging => Box::new(priority_aging(processes, config)),
        Algorithm::Mlq => Box::new(mlq(processes, config)),
        Algorithm::RateMonotonic => Box::new(rate_monotonic(processes, config)),
        Algorithm::Edf => Box::new(edf(processes, config)),
        Algorithm::SyncDemo => Box::new(sync_demo(processes, &SyncDemoConfig::default(), config)),
    }
}

/// Runs every policy over its own copy of `processes`
///
/// Returns the results in [`Algorithm::POLICIES`] order.
pub fn run_all(processes: &[ProcessDescriptor], config: &SimConfig) -> Result<Vec<SimulationResult>, SimError> {
    Algorithm::POLICIES
        .iter()
        .map(|&algorithm| build_scheduler(algorithm, processes, config).run())
        .collect()
}
