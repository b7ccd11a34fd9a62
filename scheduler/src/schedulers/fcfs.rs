use crate::common_funcs::select_front;
use crate::scheduler::{Requeue, SchedulingPolicy};
use crate::{Process, QueueSlot, ReadyQueues};

/// First-come, first-served: the head of the ready queue runs until its
/// burst ends
#[derive(Clone, Copy, Debug, Default)]
pub struct Fcfs;

impl SchedulingPolicy for Fcfs {
    fn name(&self) -> String {
        String::from("FCFS")
    }

    fn select(&self, ready: &ReadyQueues, _procs: &[Process]) -> Option<QueueSlot> {
        select_front(ready)
    }

    fn check_preemption(&self, _running: &Process, _ready: &ReadyQueues, _procs: &[Process]) -> Option<Requeue> {
        None
    }
}
