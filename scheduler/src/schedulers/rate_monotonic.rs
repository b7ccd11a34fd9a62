use crate::common_funcs::{beats_running, select_min_by_key};
use crate::scheduler::{PreemptReason, Requeue, SchedulingPolicy};
use crate::{Process, QueueSlot, ReadyQueues};

/// Rate monotonic: the shorter the period, the higher the priority
///
/// Each process is a single job; there is no periodic re-release.
#[derive(Clone, Copy, Debug, Default)]
pub struct RateMonotonic;

impl SchedulingPolicy for RateMonotonic {
    fn name(&self) -> String {
        String::from("Rate Monotonic")
    }

    fn admits(&self, process: &Process) -> bool {
        process.period() > 0
    }

    fn select(&self, ready: &ReadyQueues, procs: &[Process]) -> Option<QueueSlot> {
        select_min_by_key(ready, procs, Process::period)
    }

    fn check_preemption(&self, running: &Process, ready: &ReadyQueues, procs: &[Process]) -> Option<Requeue> {
        beats_running(running, ready, procs, Process::period)
            .then(|| Requeue::new(0, PreemptReason::Preempted))
    }
}
