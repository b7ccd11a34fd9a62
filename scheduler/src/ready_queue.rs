use std::collections::VecDeque;

/// Position of a process inside [`ReadyQueues`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueSlot {
    pub level: usize,
    pub position: usize,
}

/// The ready queues of a run, one per priority level.
///
/// Single-queue policies use one level. Entries are indices into the run's
/// process arena, kept in insertion order within each level.
#[derive(Clone, Debug)]
pub struct ReadyQueues {
    levels: Vec<VecDeque<usize>>,
}

impl ReadyQueues {
    /// Creates `levels` empty queues, at least one
    pub fn new(levels: usize) -> ReadyQueues {
        ReadyQueues {
            levels: vec![VecDeque::new(); levels.max(1)],
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Appends a process at the tail of `level`, clamped to the lowest level
    pub fn push(&mut self, level: usize, index: usize) {
        let level = level.min(self.levels.len() - 1);
        self.levels[level].push_back(index);
    }

    pub fn remove(&mut self, slot: QueueSlot) -> Option<usize> {
        self.levels.get_mut(slot.level)?.remove(slot.position)
    }

    /// Takes a process out of whichever level holds it
    pub fn remove_index(&mut self, index: usize) -> bool {
        for queue in self.levels.iter_mut() {
            if let Some(position) = queue.iter().position(|&item| item == index) {
                queue.remove(position);
                return true;
            }
        }

        false
    }

    pub fn level(&self, level: usize) -> Option<&VecDeque<usize>> {
        self.levels.get(level)
    }

    /// First non-empty level, the highest priority one
    pub fn first_non_empty(&self) -> Option<usize> {
        self.levels.iter().position(|queue| !queue.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(VecDeque::is_empty)
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(VecDeque::len).sum()
    }

    /// Every queued process with its slot, level by level, in queue order
    pub fn iter(&self) -> impl Iterator<Item = (QueueSlot, usize)> + '_ {
        self.levels.iter().enumerate().flat_map(|(level, queue)| {
            queue
                .iter()
                .enumerate()
                .map(move |(position, &index)| (QueueSlot { level, position }, index))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_clamps_to_lowest_level() {
        let mut queues = ReadyQueues::new(3);
        queues.push(7, 4);

        assert_eq!(queues.level(2).map(VecDeque::len), Some(1));
        assert_eq!(queues.first_non_empty(), Some(2));
    }

    #[test]
    fn iteration_is_level_then_insertion_order() {
        let mut queues = ReadyQueues::new(2);
        queues.push(1, 10);
        queues.push(0, 11);
        queues.push(0, 12);

        let order: Vec<usize> = queues.iter().map(|(_, index)| index).collect();
        assert_eq!(order, vec![11, 12, 10]);

        assert_eq!(queues.remove(QueueSlot { level: 0, position: 1 }), Some(12));
        assert!(queues.remove_index(10));
        assert!(!queues.remove_index(10));
        assert_eq!(queues.len(), 1);
    }
}
