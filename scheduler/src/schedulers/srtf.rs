use crate::common_funcs::{beats_running, select_min_by_key};
use crate::scheduler::{PreemptReason, Requeue, SchedulingPolicy};
use crate::{Process, QueueSlot, ReadyQueues};

/// Shortest remaining time first, the preemptive SJF
///
/// Only the current CPU burst counts; bursts after the next I/O are unknown
/// to the scheduler.
#[derive(Clone, Copy, Debug, Default)]
pub struct Srtf;

impl SchedulingPolicy for Srtf {
    fn name(&self) -> String {
        String::from("SJF (Preemptive/SRTF)")
    }

    fn select(&self, ready: &ReadyQueues, procs: &[Process]) -> Option<QueueSlot> {
        select_min_by_key(ready, procs, Process::remaining_cpu_time)
    }

    fn check_preemption(&self, running: &Process, ready: &ReadyQueues, procs: &[Process]) -> Option<Requeue> {
        beats_running(running, ready, procs, Process::remaining_cpu_time)
            .then(|| Requeue::new(0, PreemptReason::Preempted))
    }
}
