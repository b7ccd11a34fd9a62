use serde::{Deserialize, Serialize};

use crate::{Pid, ProcessState, SimError, Tick};

/// A process as handed over by the input collaborator.
///
/// The core does not validate descriptors; the parser guarantees a positive
/// pid and a non-empty `execution_pattern` of positive bursts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub pid: u32,
    pub arrival_time: Tick,
    pub priority: u32,
    /// CPU, I/O, CPU, ... burst lengths
    pub execution_pattern: Vec<u32>,
    #[serde(default)]
    pub period: u32,
    #[serde(default)]
    pub deadline: u32,
}

impl ProcessDescriptor {
    /// Creates a non real-time descriptor
    ///
    /// * `pid` - identifier of the process
    /// * `arrival_time` - tick when the process enters the ready queue
    /// * `priority` - lower numbers mean higher priority
    /// * `execution_pattern` - alternating CPU and I/O bursts, starting with CPU
    pub fn new(pid: u32, arrival_time: Tick, priority: u32, execution_pattern: Vec<u32>) -> Self {
        ProcessDescriptor {
            pid,
            arrival_time,
            priority,
            execution_pattern,
            period: 0,
            deadline: 0,
        }
    }

    pub fn with_period(mut self, period: u32) -> Self {
        self.period = period;
        self
    }

    pub fn with_deadline(mut self, deadline: u32) -> Self {
        self.deadline = deadline;
        self
    }
}

/// The process control block used by the engine.
///
/// Every run builds its own set of blocks from the descriptors, so two runs
/// never observe each other's mutations.
#[derive(Clone, Debug, Serialize)]
pub struct Process {
    /// The pid of the process
    pub(crate) pid: Pid,
    /// The tick when the process enters the ready queue
    pub(crate) arrival_time: Tick,
    /// The priority given at creation
    ///
    /// Aging never moves `priority` further than this value
    pub(crate) initial_priority: u32,
    /// The effective priority, only changed by aging
    pub(crate) priority: u32,
    pub(crate) execution_pattern: Vec<u32>,
    pub(crate) period: u32,
    pub(crate) deadline: u32,
    pub(crate) state: ProcessState,
    /// Even indices are CPU bursts, odd ones are I/O bursts
    pub(crate) current_burst_index: usize,
    pub(crate) remaining_burst_time: u32,
    /// The first tick the process ran on the CPU
    pub(crate) start_time: Option<Tick>,
    pub(crate) finish_time: Option<Tick>,
    pub(crate) response_time: Option<Tick>,
    pub(crate) waiting_time: Tick,
    pub(crate) turnaround_time: Tick,
    /// Ticks spent in the ready queue since the last dispatch, drives aging
    pub(crate) accumulated_wait_ticks: u64,
    pub(crate) time_in_ready_queue: Tick,
    pub(crate) last_ready_time: Tick,
    /// Multilevel queue level, 0 is the highest
    pub(crate) queue_level: usize,
    /// Ticks consumed from the current quantum
    pub(crate) time_slice_used: u32,
    /// Set when the process was killed instead of completing its bursts
    pub(crate) aborted: bool,
}

impl Process {
    /// Builds a fresh control block from a descriptor
    pub fn from_descriptor(descriptor: &ProcessDescriptor) -> Process {
        Process {
            pid: Pid::new(descriptor.pid),
            arrival_time: descriptor.arrival_time,
            initial_priority: descriptor.priority,
            priority: descriptor.priority,
            execution_pattern: descriptor.execution_pattern.clone(),
            period: descriptor.period,
            deadline: descriptor.deadline,
            state: ProcessState::Ready,
            current_burst_index: 0,
            remaining_burst_time: descriptor.execution_pattern.first().copied().unwrap_or(0),
            start_time: None,
            finish_time: None,
            response_time: None,
            waiting_time: 0,
            turnaround_time: 0,
            accumulated_wait_ticks: 0,
            time_in_ready_queue: 0,
            last_ready_time: descriptor.arrival_time,
            queue_level: 0,
            time_slice_used: 0,
            aborted: false,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn arrival_time(&self) -> Tick {
        self.arrival_time
    }

    pub fn initial_priority(&self) -> u32 {
        self.initial_priority
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn execution_pattern(&self) -> &[u32] {
        &self.execution_pattern
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn deadline(&self) -> u32 {
        self.deadline
    }

    /// `arrival_time + deadline`, or `None` when the process is not real-time
    pub fn absolute_deadline(&self) -> Option<Tick> {
        if self.deadline > 0 {
            Some(self.arrival_time + Tick::from(self.deadline))
        } else {
            None
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn current_burst_index(&self) -> usize {
        self.current_burst_index
    }

    pub fn remaining_burst_time(&self) -> u32 {
        self.remaining_burst_time
    }

    pub fn start_time(&self) -> Option<Tick> {
        self.start_time
    }

    pub fn finish_time(&self) -> Option<Tick> {
        self.finish_time
    }

    pub fn response_time(&self) -> Option<Tick> {
        self.response_time
    }

    pub fn waiting_time(&self) -> Tick {
        self.waiting_time
    }

    pub fn turnaround_time(&self) -> Tick {
        self.turnaround_time
    }

    pub fn accumulated_wait_ticks(&self) -> u64 {
        self.accumulated_wait_ticks
    }

    pub fn time_in_ready_queue(&self) -> Tick {
        self.time_in_ready_queue
    }

    pub fn queue_level(&self) -> usize {
        self.queue_level
    }

    pub fn time_slice_used(&self) -> u32 {
        self.time_slice_used
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Sum of the CPU bursts, I/O excluded
    pub fn total_cpu_demand(&self) -> Tick {
        self.execution_pattern
            .iter()
            .step_by(2)
            .map(|&burst| Tick::from(burst))
            .sum()
    }

    /// Remaining time of the current CPU burst only; later bursts are not
    /// known to the scheduler. Zero while on an I/O burst.
    pub fn remaining_cpu_time(&self) -> u32 {
        if self.is_cpu_burst() {
            self.remaining_burst_time
        } else {
            0
        }
    }

    pub fn is_cpu_burst(&self) -> bool {
        self.current_burst_index % 2 == 0
    }

    pub fn is_io_burst(&self) -> bool {
        self.current_burst_index % 2 == 1
    }

    pub fn is_completed(&self) -> bool {
        self.current_burst_index >= self.execution_pattern.len()
    }

    /// Runs the current CPU burst for `ticks` units of time
    ///
    /// Returns whether the burst is now finished.
    ///
    /// * `ticks` - units of time spent on the CPU
    pub fn execute(&mut self, ticks: u32) -> Result<bool, SimError> {
        if self.state == ProcessState::Terminated {
            return Err(SimError::AlreadyTerminated { pid: self.pid });
        }

        if !self.is_cpu_burst() || self.is_completed() {
            return Err(SimError::NotOnCpuBurst {
                pid: self.pid,
                burst_index: self.current_burst_index,
            });
        }

        self.remaining_burst_time = self.remaining_burst_time.saturating_sub(ticks);

        Ok(self.remaining_burst_time == 0)
    }

    /// Moves on to the next burst, the index never goes back
    pub fn complete_current_burst(&mut self) {
        self.current_burst_index += 1;

        match self.execution_pattern.get(self.current_burst_index) {
            Some(&burst) => self.remaining_burst_time = burst,
            None => {
                self.state = ProcessState::Terminated;
                self.remaining_burst_time = 0;
            }
        }
    }

    /// Puts the process back in `Ready` at tick `now`
    pub fn mark_ready(&mut self, now: Tick) {
        self.state = ProcessState::Ready;
        self.last_ready_time = now;
        self.time_in_ready_queue = 0;
    }

    /// One tick of aging: the wait counter grows and the priority improves by
    /// one level for every `aging_factor` ticks waited
    ///
    /// * `now` - current simulation tick
    /// * `aging_factor` - ticks of waiting needed to gain one priority level
    pub fn age(&mut self, now: Tick, aging_factor: u32) {
        if self.state != ProcessState::Ready {
            return;
        }

        self.time_in_ready_queue = now.saturating_sub(self.last_ready_time);
        self.accumulated_wait_ticks += 1;

        let boost = self.accumulated_wait_ticks / u64::from(aging_factor.max(1));
        let boost = u32::try_from(boost).unwrap_or(u32::MAX);
        self.priority = self.initial_priority.saturating_sub(boost);
    }

    /// Forgets the aging boost, used whenever the process gets the CPU
    pub fn reset_to_initial_priority(&mut self) {
        self.priority = self.initial_priority;
        self.accumulated_wait_ticks = 0;
    }

    /// Computes the final timings once the process leaves the system
    ///
    /// * `finish` - the tick at which the process terminated
    pub(crate) fn finalize(&mut self, finish: Tick) {
        self.state = ProcessState::Terminated;
        let finish = *self.finish_time.get_or_insert(finish);

        self.turnaround_time = finish.saturating_sub(self.arrival_time);
        self.waiting_time = self.turnaround_time.saturating_sub(self.total_cpu_demand());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(pattern: Vec<u32>) -> Process {
        Process::from_descriptor(&ProcessDescriptor::new(1, 2, 5, pattern))
    }

    #[test]
    fn cpu_demand_skips_io_bursts() {
        let proc = process(vec![4, 10, 3, 7, 2]);
        assert_eq!(proc.total_cpu_demand(), 9);
    }

    #[test]
    fn burst_parity_and_completion() {
        let mut proc = process(vec![2, 3, 1]);
        assert!(proc.is_cpu_burst());

        assert_eq!(proc.execute(1), Ok(false));
        assert_eq!(proc.execute(1), Ok(true));
        proc.complete_current_burst();

        assert!(proc.is_io_burst());
        assert_eq!(proc.remaining_burst_time(), 3);
        assert_eq!(proc.remaining_cpu_time(), 0);
        assert_eq!(
            proc.execute(1),
            Err(SimError::NotOnCpuBurst { pid: Pid::new(1), burst_index: 1 })
        );

        proc.complete_current_burst();
        proc.complete_current_burst();
        assert!(proc.is_completed());
        assert_eq!(proc.state(), ProcessState::Terminated);
        assert_eq!(proc.execute(1), Err(SimError::AlreadyTerminated { pid: Pid::new(1) }));
    }

    #[test]
    fn aging_is_floored_at_zero() {
        let mut proc = process(vec![5]);

        for tick in 0..9 {
            proc.age(tick, 10);
        }
        assert_eq!(proc.priority(), 5);

        proc.age(9, 10);
        assert_eq!(proc.priority(), 4);

        for tick in 10..200 {
            proc.age(tick, 10);
        }
        assert_eq!(proc.priority(), 0);

        proc.reset_to_initial_priority();
        assert_eq!(proc.priority(), 5);
        assert_eq!(proc.accumulated_wait_ticks(), 0);
    }

    #[test]
    fn deadline_is_relative_to_arrival() {
        let rt = Process::from_descriptor(&ProcessDescriptor::new(3, 4, 0, vec![1]).with_deadline(6));
        assert_eq!(rt.absolute_deadline(), Some(10));
        assert_eq!(process(vec![1]).absolute_deadline(), None);
    }

    #[test]
    fn finalize_derives_waiting_from_turnaround() {
        let mut proc = process(vec![3, 4, 2]);
        proc.finalize(15);

        assert_eq!(proc.turnaround_time(), 13);
        assert_eq!(proc.waiting_time(), 8);
        assert_eq!(proc.finish_time(), Some(15));

        /* the first finish time sticks */
        proc.finalize(20);
        assert_eq!(proc.finish_time(), Some(15));
    }
}
