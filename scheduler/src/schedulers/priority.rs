use std::num::NonZeroU32;

use crate::common_funcs::{beats_running, select_min_by_key};
use crate::scheduler::{PreemptReason, Requeue, SchedulingPolicy};
use crate::{Process, QueueSlot, ReadyQueues};

/// Preemptive priority scheduling, lower numbers first
///
/// The priority of a process never changes.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticPriority;

impl SchedulingPolicy for StaticPriority {
    fn name(&self) -> String {
        String::from("Priority (Static)")
    }

    fn select(&self, ready: &ReadyQueues, procs: &[Process]) -> Option<QueueSlot> {
        select_min_by_key(ready, procs, Process::priority)
    }

    fn check_preemption(&self, running: &Process, ready: &ReadyQueues, procs: &[Process]) -> Option<Requeue> {
        beats_running(running, ready, procs, Process::priority)
            .then(|| Requeue::new(0, PreemptReason::Preempted))
    }
}

/// Preemptive priority scheduling where waiting improves the priority
///
/// Each tick in the ready queue counts towards a boost of one level per
/// `aging_factor` ticks. The boost is dropped when the process gets the CPU
/// or loses it.
#[derive(Clone, Copy, Debug)]
pub struct PriorityAging {
    aging_factor: NonZeroU32,
}

impl PriorityAging {
    /// * `aging_factor` - ticks of waiting needed to gain one level
    pub fn new(aging_factor: NonZeroU32) -> PriorityAging {
        PriorityAging { aging_factor }
    }
}

impl SchedulingPolicy for PriorityAging {
    fn name(&self) -> String {
        format!("Priority with Aging (factor={})", self.aging_factor)
    }

    fn aging_factor(&self) -> Option<u32> {
        Some(self.aging_factor.get())
    }

    fn select(&self, ready: &ReadyQueues, procs: &[Process]) -> Option<QueueSlot> {
        select_min_by_key(ready, procs, Process::priority)
    }

    fn check_preemption(&self, running: &Process, ready: &ReadyQueues, procs: &[Process]) -> Option<Requeue> {
        beats_running(running, ready, procs, Process::priority)
            .then(|| Requeue::new(0, PreemptReason::Preempted))
    }

    fn on_dispatch(&self, process: &mut Process) {
        process.reset_to_initial_priority();
    }

    fn on_preempt(&self, process: &mut Process) {
        process.reset_to_initial_priority();
    }
}
