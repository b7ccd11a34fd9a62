use crate::common_funcs::select_front;
use crate::scheduler::{PreemptReason, Requeue, SchedulingPolicy};
use crate::{Process, QueueSlot, ReadyQueues};

/// Number of queue levels, 0 being the highest priority
pub const MLQ_LEVELS: usize = 3;

/// Quantum of each level; the last level runs FCFS
const LEVEL_QUANTA: [Option<u32>; MLQ_LEVELS] = [Some(8), Some(16), None];

/// Things that move a process between levels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelEvent {
    Arrival,
    QuantumExpired,
    IoCompleted,
    Preempted,
}

/// Quantum of `level`, `None` when the level never expires
pub fn quantum(level: usize) -> Option<u32> {
    LEVEL_QUANTA.get(level).copied().flatten()
}

/// The level a process lands on after `event`
///
/// * `level` - the level the process was on
/// * `event` - what happened to it
pub fn level_after(level: usize, event: LevelEvent) -> usize {
    match event {
        LevelEvent::Arrival => 0,
        LevelEvent::QuantumExpired => (level + 1).min(MLQ_LEVELS - 1),
        LevelEvent::IoCompleted | LevelEvent::Preempted => level.min(MLQ_LEVELS - 1),
    }
}

/// Multilevel feedback queue: round robin on the two upper levels (q=8 and
/// q=16), FCFS at the bottom
///
/// Using up a quantum demotes a process one level. A process on a lower
/// level is preempted as soon as a higher level has work.
#[derive(Clone, Copy, Debug, Default)]
pub struct MultilevelQueue;

impl SchedulingPolicy for MultilevelQueue {
    fn name(&self) -> String {
        String::from("Multi-Level Queue")
    }

    fn queue_levels(&self) -> usize {
        MLQ_LEVELS
    }

    fn select(&self, ready: &ReadyQueues, _procs: &[Process]) -> Option<QueueSlot> {
        select_front(ready)
    }

    fn check_preemption(&self, running: &Process, ready: &ReadyQueues, _procs: &[Process]) -> Option<Requeue> {
        let level = running.queue_level();

        if let Some(limit) = quantum(level) {
            if running.time_slice_used() >= limit {
                let demoted = level_after(level, LevelEvent::QuantumExpired);
                return Some(Requeue::new(demoted, PreemptReason::Demoted));
            }
        }

        match ready.first_non_empty() {
            Some(waiting_level) if waiting_level < level => Some(Requeue::new(
                level_after(level, LevelEvent::Preempted),
                PreemptReason::Preempted,
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProcessDescriptor;

    #[test]
    fn level_transitions() {
        assert_eq!(level_after(2, LevelEvent::Arrival), 0);
        assert_eq!(level_after(0, LevelEvent::QuantumExpired), 1);
        assert_eq!(level_after(1, LevelEvent::QuantumExpired), 2);
        assert_eq!(level_after(2, LevelEvent::QuantumExpired), 2);
        assert_eq!(level_after(1, LevelEvent::IoCompleted), 1);
        assert_eq!(level_after(1, LevelEvent::Preempted), 1);
    }

    #[test]
    fn quanta_per_level() {
        assert_eq!(quantum(0), Some(8));
        assert_eq!(quantum(1), Some(16));
        assert_eq!(quantum(2), None);
        assert_eq!(quantum(3), None);
    }

    #[test]
    fn higher_level_work_preempts() {
        let mut procs: Vec<Process> = [
            ProcessDescriptor::new(1, 0, 0, vec![40]),
            ProcessDescriptor::new(2, 5, 0, vec![4]),
        ]
        .iter()
        .map(Process::from_descriptor)
        .collect();
        procs[0].queue_level = 1;
        procs[0].time_slice_used = 3;

        let mut ready = ReadyQueues::new(MLQ_LEVELS);
        assert_eq!(MultilevelQueue.check_preemption(&procs[0], &ready, &procs), None);

        ready.push(0, 1);
        assert_eq!(
            MultilevelQueue.check_preemption(&procs[0], &ready, &procs),
            Some(Requeue::new(1, PreemptReason::Preempted))
        );

        procs[0].time_slice_used = 16;
        assert_eq!(
            MultilevelQueue.check_preemption(&procs[0], &ready, &procs),
            Some(Requeue::new(2, PreemptReason::Demoted))
        );
    }
}
