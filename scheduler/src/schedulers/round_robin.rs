use std::num::NonZeroU32;

use crate::common_funcs::select_front;
use crate::scheduler::{PreemptReason, Requeue, SchedulingPolicy};
use crate::{Process, QueueSlot, ReadyQueues};

/// Round robin over a single FIFO queue
#[derive(Clone, Copy, Debug)]
pub struct RoundRobin {
    /// The time quanta that a process can run before it is preempted
    quantum: NonZeroU32,
}

impl RoundRobin {
    /// * `quantum` - ticks a process may run before going back to the tail
    pub fn new(quantum: NonZeroU32) -> RoundRobin {
        RoundRobin { quantum }
    }

    pub fn quantum(&self) -> NonZeroU32 {
        self.quantum
    }
}

impl SchedulingPolicy for RoundRobin {
    fn name(&self) -> String {
        format!("Round Robin (q={})", self.quantum)
    }

    fn select(&self, ready: &ReadyQueues, _procs: &[Process]) -> Option<QueueSlot> {
        select_front(ready)
    }

    /// The quantum is checked even with an empty queue; the process then
    /// goes to the tail and is picked again right away
    fn check_preemption(&self, running: &Process, _ready: &ReadyQueues, _procs: &[Process]) -> Option<Requeue> {
        (running.time_slice_used() >= self.quantum.get())
            .then(|| Requeue::new(0, PreemptReason::QuantumExpired))
    }
}
