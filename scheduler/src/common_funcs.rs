use crate::{Process, QueueSlot, ReadyQueues};

/// Returns the ready process with the smallest `key`
///
/// Ties go to the earlier arrival, then to the earlier position in the
/// process set, so every selection is a total order.
///
/// * `ready` - the ready queues
/// * `procs` - the process arena the queues index into
/// * `key` - the policy's primary ordering key
pub fn select_min_by_key<K, F>(ready: &ReadyQueues, procs: &[Process], key: F) -> Option<QueueSlot>
where
    K: Ord,
    F: Fn(&Process) -> K,
{
    ready
        .iter()
        .min_by_key(|&(_, index)| {
            let proc = &procs[index];
            (key(proc), proc.arrival_time(), index)
        })
        .map(|(slot, _)| slot)
}

/// Returns the head of the first non-empty level
pub fn select_front(ready: &ReadyQueues) -> Option<QueueSlot> {
    ready
        .first_non_empty()
        .map(|level| QueueSlot { level, position: 0 })
}

/// Whether the best ready candidate beats `running` strictly on `key`
///
/// * `running` - the process on the CPU
/// * `ready` - the ready queues
/// * `procs` - the process arena the queues index into
/// * `key` - the policy's primary ordering key
pub fn beats_running<K, F>(running: &Process, ready: &ReadyQueues, procs: &[Process], key: F) -> bool
where
    K: Ord,
    F: Fn(&Process) -> K,
{
    return if let Some(slot) = select_min_by_key(ready, procs, &key) {
        let candidate = ready
            .level(slot.level)
            .and_then(|queue| queue.get(slot.position))
            .map(|&index| &procs[index]);

        candidate.is_some_and(|candidate| key(candidate) < key(running))
    } else {
        false
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProcessDescriptor;

    fn arena() -> Vec<Process> {
        [
            ProcessDescriptor::new(1, 3, 2, vec![6]),
            ProcessDescriptor::new(2, 1, 2, vec![6]),
            ProcessDescriptor::new(3, 1, 2, vec![6]),
            ProcessDescriptor::new(4, 0, 5, vec![6]),
        ]
        .iter()
        .map(Process::from_descriptor)
        .collect()
    }

    #[test]
    fn ties_fall_back_to_arrival_then_construction_order() {
        let procs = arena();
        let mut ready = ReadyQueues::new(1);
        for index in [0, 2, 1, 3] {
            ready.push(0, index);
        }

        let slot = select_min_by_key(&ready, &procs, |proc| proc.priority());
        /* P2 and P3 both arrived at 1, P2 comes first in the process set */
        assert_eq!(slot, Some(QueueSlot { level: 0, position: 2 }));
    }

    #[test]
    fn equal_keys_never_preempt() {
        let procs = arena();
        let mut ready = ReadyQueues::new(1);
        ready.push(0, 1);

        assert!(!beats_running(&procs[0], &ready, &procs, |proc| proc.priority()));
        assert!(beats_running(&procs[3], &ready, &procs, |proc| proc.priority()));
    }
}
