use crate::{Process, QueueSlot, ReadyQueues, SimError, SimulationResult, Snapshot};

/// Why a running process was sent back to the ready queues
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreemptReason {
    /// A better candidate became ready
    Preempted,
    /// The quantum ran out, the process keeps its level
    QuantumExpired,
    /// The quantum ran out and the process moves one level down
    Demoted,
}

/// Where a preempted process goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Requeue {
    pub level: usize,
    pub reason: PreemptReason,
}

impl Requeue {
    pub fn new(level: usize, reason: PreemptReason) -> Requeue {
        Requeue { level, reason }
    }
}

/// The part of a scheduling algorithm that differs from one policy to
/// another: which ready process gets the CPU, and when the running one
/// has to give it back.
///
/// Everything else (arrivals, I/O, context switches, statistics) is done by
/// the engine the policy is plugged into.
pub trait SchedulingPolicy {
    /// Display name used in the event log and the results
    fn name(&self) -> String;

    /// Whether the process takes part in this run at all
    ///
    /// Real-time policies drop processes without a period or deadline.
    fn admits(&self, _process: &Process) -> bool {
        true
    }

    /// Number of ready queues the engine has to keep
    fn queue_levels(&self) -> usize {
        1
    }

    /// Aging factor, when the policy ages waiting processes every tick
    fn aging_factor(&self) -> Option<u32> {
        None
    }

    /// Picks the next process to dispatch, without removing it
    ///
    /// * `ready` - the ready queues
    /// * `procs` - the process arena the queues index into
    fn select(&self, ready: &ReadyQueues, procs: &[Process]) -> Option<QueueSlot>;

    /// Decides whether `running` has to leave the CPU before this tick runs
    ///
    /// * `running` - the process currently on the CPU
    /// * `ready` - the ready queues
    /// * `procs` - the process arena the queues index into
    fn check_preemption(&self, running: &Process, ready: &ReadyQueues, procs: &[Process]) -> Option<Requeue>;

    /// Called when a process is taken out of the ready queues for the CPU
    fn on_dispatch(&self, _process: &mut Process) {}

    /// Called when a running process is preempted
    fn on_preempt(&self, _process: &mut Process) {}
}

/// The control surface seen by drivers, live viewers and reporting.
pub trait Scheduler {
    fn name(&self) -> &str;

    /// Advances the simulation by one tick
    ///
    /// Returns `true` once the run is complete, either because every process
    /// terminated or because the tick limit was exceeded.
    fn execute_one_step(&mut self) -> Result<bool, SimError>;

    fn is_complete(&self) -> bool;

    /// Read-only view of the current queues, for UI polling
    fn get_current_snapshot(&self) -> Snapshot<'_>;

    /// Copies out the trace, log and statistics gathered so far
    fn results(&self) -> SimulationResult;

    /// Runs the simulation to completion
    fn run(&mut self) -> Result<SimulationResult, SimError> {
        while !self.execute_one_step()? {}

        Ok(self.results())
    }
}
