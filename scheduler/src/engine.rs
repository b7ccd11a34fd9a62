use log::{debug, info, warn};

use crate::collector::Collector;
use crate::scheduler::{PreemptReason, Requeue, Scheduler, SchedulingPolicy};
use crate::statistics::{DeadlockReport, SchedulerStats, SimulationResult};
use crate::{
    GanttEntry, GanttOwner, Pid, Process, ProcessDescriptor, ProcessState, ReadyQueues, SimConfig,
    SimError, Snapshot, Tick,
};

/// What the CPU is doing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Cpu {
    Idle,
    /// Paying the context switch overhead before `target` can run
    Switching { remaining: u32, target: usize },
    Running(usize),
}

/// State shared by every stepper: the process arena, the queues, the CPU
/// slot and the traces.
///
/// The methods here are the transitions all algorithms have in common; a
/// stepper only decides in which order to call them.
pub(crate) struct SimCore {
    pub(crate) name: String,
    pub(crate) current_time: Tick,
    /// Every process of the run, owned by the run
    pub(crate) processes: Vec<Process>,
    pub(crate) ready: ReadyQueues,
    /// Processes doing I/O, or blocked in the sync demo
    pub(crate) waiting: Vec<usize>,
    /// Pending `(completion tick, process)` pairs, in submission order
    pub(crate) io_completions: Vec<(Tick, usize)>,
    pub(crate) cpu: Cpu,
    /// The last process that got the CPU, decides whether a switch is billed
    pub(crate) previous: Option<Pid>,
    /// Start of the Gantt span of the running process
    pub(crate) span_start: Option<Tick>,
    pub(crate) gantt: Vec<GanttEntry>,
    pub(crate) event_log: Vec<String>,
    pub(crate) stats: SchedulerStats,
    pub(crate) terminated: Vec<usize>,
    pub(crate) timed_out: bool,
    finished: bool,
    context_switch_overhead: u32,
    tick_limit: Tick,
}

impl SimCore {
    /// Creates the shared state and logs the start of the run
    ///
    /// * `name` - algorithm name
    /// * `processes` - the arena, already filtered by the policy
    /// * `levels` - number of ready queues
    /// * `context_switch_overhead` - ticks billed per switch
    /// * `tick_limit` - runs still going past this tick are stopped
    pub(crate) fn new(
        name: String,
        processes: Vec<Process>,
        levels: usize,
        context_switch_overhead: u32,
        tick_limit: Tick,
    ) -> SimCore {
        let mut core = SimCore {
            name,
            current_time: 0,
            processes,
            ready: ReadyQueues::new(levels),
            waiting: Vec::new(),
            io_completions: Vec::new(),
            cpu: Cpu::Idle,
            previous: None,
            span_start: None,
            gantt: Vec::new(),
            event_log: Vec::new(),
            stats: SchedulerStats::default(),
            terminated: Vec::new(),
            timed_out: false,
            finished: false,
            context_switch_overhead,
            tick_limit,
        };

        info!("{}: starting with {} processes", core.name, core.processes.len());
        let banner = format!("===== {} Scheduling Started =====", core.name);
        core.log_event(banner);

        core
    }

    pub(crate) fn log_event(&mut self, message: impl AsRef<str>) {
        let entry = format!("[T={:3}] {}", self.current_time, message.as_ref());
        debug!("{}: {}", self.name, entry);
        self.event_log.push(entry);
    }

    /// Appends an interval to the Gantt trace, empty intervals are dropped
    pub(crate) fn add_to_gantt(&mut self, owner: GanttOwner, start: Tick, end: Tick, state: ProcessState) {
        if start < end {
            self.gantt.push(GanttEntry { owner, start, end, state });
        }
    }

    fn queue_label(&self, level: usize) -> String {
        if self.ready.level_count() > 1 {
            format!("Queue {}", level)
        } else {
            String::from("Ready Queue")
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.timed_out || self.terminated.len() >= self.processes.len()
    }

    pub(crate) fn running(&self) -> Option<usize> {
        match self.cpu {
            Cpu::Running(index) => Some(index),
            _ => None,
        }
    }

    /// Every process arriving at the current tick joins the top level
    pub(crate) fn admit_arrivals(&mut self) {
        let now = self.current_time;

        for index in 0..self.processes.len() {
            let proc = &mut self.processes[index];
            if proc.arrival_time != now || proc.state != ProcessState::Ready {
                continue;
            }

            proc.mark_ready(now);
            proc.queue_level = 0;
            let pid = proc.pid;
            self.ready.push(0, index);

            let label = self.queue_label(0);
            self.log_event(format!("P{} arrived → {}", pid, label));
        }
    }

    /// Returns the processes whose I/O is over to their previous level
    pub(crate) fn complete_io(&mut self) {
        let now = self.current_time;
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.io_completions)
            .into_iter()
            .partition(|(completion, _)| *completion <= now);
        self.io_completions = pending;

        for (_, index) in due {
            self.waiting.retain(|&item| item != index);

            let proc = &mut self.processes[index];
            proc.complete_current_burst();

            if proc.is_completed() {
                self.terminate(index, now);
                continue;
            }

            proc.mark_ready(now);
            let (pid, level) = (proc.pid, proc.queue_level);
            self.ready.push(level, index);

            let label = self.queue_label(level);
            self.log_event(format!("P{} I/O completed → {}", pid, label));
        }
    }

    /// One tick of aging for everything in the ready queues
    pub(crate) fn age_ready(&mut self, aging_factor: u32) {
        let now = self.current_time;

        for (_, index) in self.ready.iter() {
            self.processes[index].age(now, aging_factor);
        }
    }

    /// Hands the CPU to `index`, which has already left the ready queues
    ///
    /// Returns `true` when a billed context switch consumed the current tick.
    pub(crate) fn dispatch(&mut self, index: usize) -> bool {
        let pid = self.processes[index].pid;
        let billed = matches!(self.previous, Some(previous) if previous != pid);

        if let (true, Some(previous)) = (billed, self.previous) {
            self.stats.context_switches += 1;
            self.log_event(format!("Context Switch: P{} → P{}", previous, pid));
        }

        self.previous = Some(pid);
        self.processes[index].time_slice_used = 0;

        if billed && self.context_switch_overhead > 0 {
            let now = self.current_time;
            let end = now + Tick::from(self.context_switch_overhead);

            self.processes[index].state = ProcessState::ContextSwitching;
            self.cpu = Cpu::Switching {
                remaining: self.context_switch_overhead,
                target: index,
            };
            self.add_to_gantt(GanttOwner::ContextSwitch, now, end, ProcessState::ContextSwitching);

            /* the dispatch tick is the first switch tick */
            self.advance_switch();
            return true;
        }

        self.start_running(index, self.current_time);
        false
    }

    /// Spends the current tick on the pending context switch
    pub(crate) fn advance_switch(&mut self) {
        if let Cpu::Switching { remaining, target } = self.cpu {
            let remaining = remaining.saturating_sub(1);

            if remaining == 0 {
                self.start_running(target, self.current_time + 1);
            } else {
                self.cpu = Cpu::Switching { remaining, target };
            }
        }
    }

    /// Puts `index` on the CPU, its first tick of execution being `at`
    fn start_running(&mut self, index: usize, at: Tick) {
        let proc = &mut self.processes[index];
        proc.state = ProcessState::Running;

        if proc.start_time.is_none() {
            proc.start_time = Some(at);
            proc.response_time = Some(at.saturating_sub(proc.arrival_time));
        }

        let pid = proc.pid;
        self.span_start = Some(at);
        self.cpu = Cpu::Running(index);
        self.log_event(format!("P{} → Running", pid));
    }

    /// Closes the open Gantt span of `index` at `end`
    pub(crate) fn flush_span(&mut self, index: usize, end: Tick) {
        if let Some(start) = self.span_start.take() {
            let pid = self.processes[index].pid;
            self.add_to_gantt(GanttOwner::Process(pid), start, end, ProcessState::Running);
        }
    }

    /// Sends the running process `index` back to the ready queues
    pub(crate) fn preempt(&mut self, index: usize, requeue: Requeue) {
        let now = self.current_time;
        self.flush_span(index, now);

        let proc = &mut self.processes[index];
        proc.mark_ready(now);
        proc.queue_level = requeue.level.min(self.ready.level_count() - 1);
        proc.time_slice_used = 0;

        let (pid, level) = (proc.pid, proc.queue_level);
        self.ready.push(level, index);
        self.cpu = Cpu::Idle;

        let label = self.queue_label(level);
        let message = match requeue.reason {
            PreemptReason::Preempted => format!("P{} preempted → {}", pid, label),
            PreemptReason::QuantumExpired => format!("P{} time slice expired → {}", pid, label),
            PreemptReason::Demoted => format!("P{} demoted → {}", pid, label),
        };
        self.log_event(message);
    }

    /// Runs the process on the CPU for one tick
    pub(crate) fn execute_running(&mut self, index: usize) -> Result<(), SimError> {
        let now = self.current_time;
        let finished = self.processes[index].execute(1)?;

        self.stats.cpu_busy_time += 1;
        self.processes[index].time_slice_used += 1;

        if !finished {
            return Ok(());
        }

        self.flush_span(index, now + 1);
        self.cpu = Cpu::Idle;

        let proc = &mut self.processes[index];
        proc.complete_current_burst();
        proc.time_slice_used = 0;

        if proc.is_completed() {
            self.terminate(index, now + 1);
            Ok(())
        } else {
            self.start_io(index)
        }
    }

    /// Moves `index` to the waiting queue for the length of its I/O burst
    pub(crate) fn start_io(&mut self, index: usize) -> Result<(), SimError> {
        let now = self.current_time;
        let proc = &mut self.processes[index];

        if !proc.is_io_burst() || proc.is_completed() {
            return Err(SimError::NotOnIoBurst {
                pid: proc.pid,
                burst_index: proc.current_burst_index,
            });
        }

        proc.state = ProcessState::Waiting;
        let pid = proc.pid;
        let duration = proc.remaining_burst_time;
        let completion = now + Tick::from(duration);

        self.io_completions.push((completion, index));
        self.waiting.push(index);
        /* the current tick still belongs to the CPU burst */
        self.add_to_gantt(GanttOwner::Process(pid), now + 1, completion, ProcessState::Waiting);
        self.log_event(format!("P{} → I/O (duration={}) → Waiting", pid, duration));

        Ok(())
    }

    /// Removes `index` from the system for good
    pub(crate) fn terminate(&mut self, index: usize, finish: Tick) {
        let proc = &mut self.processes[index];
        proc.finalize(finish);

        let message = format!(
            "P{} → Terminated (WT={}, TT={})",
            proc.pid, proc.waiting_time, proc.turnaround_time
        );
        self.terminated.push(index);
        self.log_event(message);
    }

    pub(crate) fn record_idle_tick(&mut self) {
        let now = self.current_time;
        self.add_to_gantt(GanttOwner::Idle, now, now + 1, ProcessState::Ready);
    }

    /// Closes the current tick
    ///
    /// Returns whether the run is over.
    pub(crate) fn finish_tick(&mut self) -> bool {
        self.current_time += 1;

        if !self.is_complete() && self.current_time > self.tick_limit {
            warn!(
                "{}: no completion after {} ticks, stopping with partial results",
                self.name, self.tick_limit
            );
            self.timed_out = true;
            self.log_event("WARNING: Simulation timeout");
        }

        if self.is_complete() {
            self.finish();
        }

        self.is_complete()
    }

    /// Logs the end of the run, only once
    pub(crate) fn finish(&mut self) {
        if self.finished {
            return;
        }

        self.finished = true;
        let banner = format!("===== {} Scheduling Completed =====", self.name);
        self.log_event(banner);
        info!(
            "{}: finished at T={} ({} of {} processes terminated)",
            self.name,
            self.current_time,
            self.terminated.len(),
            self.processes.len()
        );
    }

    pub(crate) fn snapshot(&self) -> Snapshot<'_> {
        let switching_to = match self.cpu {
            Cpu::Switching { target, .. } => Some(&self.processes[target]),
            _ => None,
        };

        Snapshot {
            time: self.current_time,
            running: self.running().map(|index| &self.processes[index]),
            switching_to,
            ready: self.collect_ready(),
            waiting: self.collect_waiting(),
            terminated: self.collect_terminated(),
            context_switches: self.stats.context_switches,
            cpu_busy_time: self.stats.cpu_busy_time,
            latest_gantt_entry: self.gantt.last().copied(),
            latest_log: self.event_log.last().map(String::as_str),
        }
    }

    pub(crate) fn results(&self, deadlock_report: Option<DeadlockReport>) -> SimulationResult {
        let terminated = self.collect_terminated();

        SimulationResult {
            algorithm: self.name.clone(),
            statistics: self.stats.summarize(terminated.iter().copied(), self.current_time),
            gantt_chart: self.gantt.clone(),
            event_log: self.event_log.clone(),
            processes: terminated.into_iter().cloned().collect(),
            total_time: self.current_time,
            timed_out: self.timed_out,
            deadlock_report,
        }
    }
}

impl Collector for SimCore {
    fn collect_running(&self) -> Vec<&Process> {
        self.running().map(|index| &self.processes[index]).into_iter().collect()
    }

    fn collect_ready(&self) -> Vec<&Process> {
        self.ready.iter().map(|(_, index)| &self.processes[index]).collect()
    }

    fn collect_waiting(&self) -> Vec<&Process> {
        self.waiting.iter().map(|&index| &self.processes[index]).collect()
    }

    fn collect_terminated(&self) -> Vec<&Process> {
        self.terminated.iter().map(|&index| &self.processes[index]).collect()
    }
}

/// A scheduling policy plugged into the shared stepping engine
pub struct Simulation<P: SchedulingPolicy> {
    core: SimCore,
    policy: P,
}

impl<P: SchedulingPolicy> Simulation<P> {
    /// Builds a run over private copies of `descriptors`
    ///
    /// * `policy` - the selection and preemption rules
    /// * `descriptors` - the process set, left untouched
    /// * `config` - overhead and tick limit of the run
    pub fn new(policy: P, descriptors: &[ProcessDescriptor], config: &SimConfig) -> Simulation<P> {
        let processes: Vec<Process> = descriptors
            .iter()
            .map(Process::from_descriptor)
            .filter(|proc| policy.admits(proc))
            .collect();

        let core = SimCore::new(
            policy.name(),
            processes,
            policy.queue_levels(),
            config.context_switch_overhead,
            config.tick_limit,
        );

        Simulation { core, policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn current_time(&self) -> Tick {
        self.core.current_time
    }

    /// Checks the running process against the policy and preempts it when
    /// asked to
    fn check_preemption(&mut self) {
        let Some(index) = self.core.running() else {
            return;
        };

        let decision = self.policy.check_preemption(
            &self.core.processes[index],
            &self.core.ready,
            &self.core.processes,
        );

        if let Some(requeue) = decision {
            self.policy.on_preempt(&mut self.core.processes[index]);
            self.core.preempt(index, requeue);
        }
    }

    /// Lets the policy pick a process for the idle CPU
    ///
    /// Returns `true` when the dispatch started a context switch.
    fn select_and_dispatch(&mut self) -> bool {
        let Some(slot) = self.policy.select(&self.core.ready, &self.core.processes) else {
            return false;
        };

        let Some(index) = self.core.ready.remove(slot) else {
            return false;
        };

        self.policy.on_dispatch(&mut self.core.processes[index]);
        self.core.dispatch(index)
    }
}

impl<P: SchedulingPolicy> Scheduler for Simulation<P> {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn execute_one_step(&mut self) -> Result<bool, SimError> {
        if self.core.is_complete() {
            self.core.finish();
            return Ok(true);
        }

        self.core.admit_arrivals();
        self.core.complete_io();

        if let Some(factor) = self.policy.aging_factor() {
            self.core.age_ready(factor);
        }

        let mut switching = false;
        match self.core.cpu {
            Cpu::Switching { .. } => {
                self.core.advance_switch();
                switching = true;
            }
            Cpu::Running(_) => self.check_preemption(),
            Cpu::Idle => {}
        }

        if !switching && self.core.cpu == Cpu::Idle {
            switching = self.select_and_dispatch();
        }

        if !switching {
            match self.core.running() {
                Some(index) => self.core.execute_running(index)?,
                None => self.core.record_idle_tick(),
            }
        }

        Ok(self.core.finish_tick())
    }

    fn is_complete(&self) -> bool {
        self.core.is_complete()
    }

    fn get_current_snapshot(&self) -> Snapshot<'_> {
        self.core.snapshot()
    }

    fn results(&self) -> SimulationResult {
        self.core.results(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fcfs, CONTEXT_SWITCH_SENTINEL, IDLE_SENTINEL};

    fn config(overhead: u32) -> SimConfig {
        SimConfig::default().with_context_switch_overhead(overhead)
    }

    fn run(descriptors: &[ProcessDescriptor], overhead: u32) -> SimulationResult {
        Simulation::new(Fcfs, descriptors, &config(overhead)).run().unwrap()
    }

    fn spans(result: &SimulationResult) -> Vec<(i64, Tick, Tick, ProcessState)> {
        result
            .gantt_chart
            .iter()
            .map(|entry| (entry.owner.sentinel(), entry.start, entry.end, entry.state))
            .collect()
    }

    #[test]
    fn io_burst_leaves_the_cpu_idle() {
        let result = run(&[ProcessDescriptor::new(1, 0, 0, vec![2, 3, 2])], 0);

        assert_eq!(
            spans(&result),
            vec![
                (1, 0, 2, ProcessState::Running),
                (1, 2, 4, ProcessState::Waiting),
                (IDLE_SENTINEL, 2, 3, ProcessState::Ready),
                (IDLE_SENTINEL, 3, 4, ProcessState::Ready),
                (1, 4, 6, ProcessState::Running),
            ]
        );

        let proc = &result.processes[0];
        assert_eq!(proc.finish_time(), Some(6));
        assert_eq!(proc.waiting_time(), 2);
        /* the same process coming back is not a switch */
        assert_eq!(result.statistics.context_switches, 0);
    }

    #[test]
    fn trailing_io_burst_terminates_at_completion() {
        let result = run(&[ProcessDescriptor::new(1, 0, 0, vec![2, 3])], 0);

        let proc = &result.processes[0];
        assert_eq!(proc.finish_time(), Some(4));
        assert_eq!(proc.current_burst_index(), 2);
        assert_eq!(result.total_time, 5);
    }

    #[test]
    fn arrivals_during_a_switch_are_admitted() {
        let descriptors = [
            ProcessDescriptor::new(1, 0, 0, vec![2]),
            ProcessDescriptor::new(2, 0, 0, vec![2]),
            ProcessDescriptor::new(3, 3, 0, vec![1]),
        ];
        let result = run(&descriptors, 2);

        assert_eq!(
            spans(&result),
            vec![
                (1, 0, 2, ProcessState::Running),
                (CONTEXT_SWITCH_SENTINEL, 2, 4, ProcessState::ContextSwitching),
                (2, 4, 6, ProcessState::Running),
                (CONTEXT_SWITCH_SENTINEL, 6, 8, ProcessState::ContextSwitching),
                (3, 8, 9, ProcessState::Running),
            ]
        );
        assert_eq!(result.statistics.context_switches, 2);

        let p2 = &result.processes[1];
        assert_eq!(p2.start_time(), Some(4));
        assert_eq!(p2.response_time(), Some(4));
        /* billed switch ticks count as waiting */
        assert_eq!(p2.waiting_time(), 4);
    }

    #[test]
    fn event_log_is_framed_and_timestamped() {
        let result = run(&[ProcessDescriptor::new(7, 0, 0, vec![1])], 0);

        assert_eq!(result.event_log.first().map(String::as_str), Some("[T=  0] ===== FCFS Scheduling Started ====="));
        assert!(result.event_log.contains(&String::from("[T=  0] P7 → Running")));
        assert_eq!(result.event_log.last().map(String::as_str), Some("[T=  1] ===== FCFS Scheduling Completed ====="));
    }
}
