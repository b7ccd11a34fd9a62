use crate::common_funcs::{beats_running, select_min_by_key};
use crate::scheduler::{PreemptReason, Requeue, SchedulingPolicy};
use crate::{Process, QueueSlot, ReadyQueues, Tick};

/// Earliest deadline first over absolute deadlines
///
/// Each process is a single job; there is no periodic re-release.
#[derive(Clone, Copy, Debug, Default)]
pub struct Edf;

fn deadline_key(process: &Process) -> Tick {
    process.absolute_deadline().unwrap_or(Tick::MAX)
}

impl SchedulingPolicy for Edf {
    fn name(&self) -> String {
        String::from("EDF (Earliest Deadline First)")
    }

    fn admits(&self, process: &Process) -> bool {
        process.deadline() > 0
    }

    fn select(&self, ready: &ReadyQueues, procs: &[Process]) -> Option<QueueSlot> {
        select_min_by_key(ready, procs, deadline_key)
    }

    fn check_preemption(&self, running: &Process, ready: &ReadyQueues, procs: &[Process]) -> Option<Requeue> {
        beats_running(running, ready, procs, deadline_key)
            .then(|| Requeue::new(0, PreemptReason::Preempted))
    }
}
