use crate::{GanttEntry, Process, Tick};

/// Gathers the processes of a run by queue
pub trait Collector {
    /// Returns the process on the CPU, if any
    fn collect_running(&self) -> Vec<&Process>;

    /// Returns the ready processes, highest level first, in queue order
    fn collect_ready(&self) -> Vec<&Process>;

    /// Returns the processes doing I/O or blocked on a sync primitive
    fn collect_waiting(&self) -> Vec<&Process>;

    /// Returns the processes that left the system, in termination order
    fn collect_terminated(&self) -> Vec<&Process>;
}

pub fn collect_all(scheduler: &dyn Collector) -> Vec<&Process> {
    let mut procs: Vec<&Process> = Vec::new();

    procs.extend(scheduler.collect_running());
    procs.extend(scheduler.collect_ready());
    procs.extend(scheduler.collect_waiting());
    procs.extend(scheduler.collect_terminated());

    procs
}

/// What a live viewer sees between two ticks
#[derive(Clone, Debug)]
pub struct Snapshot<'a> {
    pub time: Tick,
    pub running: Option<&'a Process>,
    /// Process the CPU is currently switching to
    pub switching_to: Option<&'a Process>,
    pub ready: Vec<&'a Process>,
    pub waiting: Vec<&'a Process>,
    pub terminated: Vec<&'a Process>,
    pub context_switches: u64,
    pub cpu_busy_time: Tick,
    pub latest_gantt_entry: Option<GanttEntry>,
    pub latest_log: Option<&'a str>,
}
