use log::warn;

use crate::collector::Snapshot;
use crate::common_funcs::select_front;
use crate::engine::{Cpu, SimCore};
use crate::scheduler::Scheduler;
use crate::statistics::{DeadlockReport, SimulationResult};
use crate::sync::SyncManager;
use crate::{
    GanttOwner, Pid, Process, ProcessDescriptor, ProcessState, SimConfig, SimError,
    SyncDemoConfig,
};

const EMPTY: &str = "empty";
const FULL: &str = "full";
const MUTEX: &str = "mutex";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncRole {
    Producer,
    Consumer,
}

impl SyncRole {
    /// Semaphore taken before entering the critical section
    fn acquires(&self) -> &'static str {
        match self {
            SyncRole::Producer => EMPTY,
            SyncRole::Consumer => FULL,
        }
    }

    /// Semaphore signalled when leaving the critical section
    fn releases(&self) -> &'static str {
        match self {
            SyncRole::Producer => FULL,
            SyncRole::Consumer => EMPTY,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SyncRole::Producer => "producer",
            SyncRole::Consumer => "consumer",
        }
    }
}

/// Where a demo process is in its current round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    /// Needs its semaphore
    Idle,
    /// Holds the semaphore, needs the mutex
    WaitMutex,
    /// Holds the mutex and works on the buffer
    Critical,
    Done,
}

#[derive(Clone, Copy, Debug)]
struct SyncTask {
    role: SyncRole,
    phase: SyncPhase,
    rounds_done: u32,
    critical_ticks_done: u32,
}

/// Producer-consumer over a bounded buffer, one producer and one consumer
/// scheduled round robin.
///
/// Each round is: wait on the role's semaphore, lock the mutex, spend
/// `critical_section_ticks` on the CPU, unlock and signal the other
/// semaphore. The wait-for graph is checked periodically; a deadlock is
/// resolved by aborting the lowest pid of the cycle.
pub struct SyncDemo {
    core: SimCore,
    config: SyncDemoConfig,
    sync: SyncManager,
    /// Parallel to the process arena
    tasks: Vec<SyncTask>,
    report: DeadlockReport,
}

impl SyncDemo {
    /// Picks the producer and the consumer out of `descriptors`
    ///
    /// The producer is the first process with priority 3 or better, the
    /// consumer the first other one with priority 4 or worse; otherwise the
    /// first processes in the set are used.
    ///
    /// * `descriptors` - candidate processes, left untouched
    /// * `config` - buffer size, rounds and timings of the demo
    /// * `sim` - supplies the context switch overhead
    pub fn new(descriptors: &[ProcessDescriptor], config: &SyncDemoConfig, sim: &SimConfig) -> SyncDemo {
        let producer = descriptors
            .iter()
            .position(|desc| desc.priority <= 3)
            .or(if descriptors.is_empty() { None } else { Some(0) });

        let consumer = producer.and_then(|producer| {
            let others = || descriptors.iter().enumerate().filter(move |(index, _)| *index != producer);

            others()
                .find(|(_, desc)| desc.priority >= 4)
                .or_else(|| others().next())
                .map(|(index, _)| index)
        });

        let burst = config.rounds * config.critical_section_ticks;
        let mut processes = Vec::new();
        let mut tasks = Vec::new();

        let picks = [(producer, SyncRole::Producer), (consumer, SyncRole::Consumer)];
        for (pick, role) in picks {
            let Some(index) = pick else {
                continue;
            };

            let mut desc = descriptors[index].clone();
            desc.arrival_time = 0;
            desc.execution_pattern = vec![burst];

            processes.push(Process::from_descriptor(&desc));
            tasks.push(SyncTask {
                role,
                phase: SyncPhase::Idle,
                rounds_done: 0,
                critical_ticks_done: 0,
            });
        }

        let mut sync = SyncManager::new();
        sync.semaphore(EMPTY, config.buffer_size);
        sync.semaphore(FULL, 0);
        sync.mutex(MUTEX);

        let core = SimCore::new(
            String::from("Sync Demo: Producer-Consumer"),
            processes,
            1,
            sim.context_switch_overhead,
            config.tick_limit,
        );

        SyncDemo {
            core,
            config: config.clone(),
            sync,
            tasks,
            report: DeadlockReport::default(),
        }
    }

    pub fn sync_manager(&self) -> &SyncManager {
        &self.sync
    }

    pub fn deadlock_report(&self) -> DeadlockReport {
        self.report
    }

    /// Role and phase of `pid`, if it takes part in the demo
    pub fn task_of(&self, pid: Pid) -> Option<(SyncRole, SyncPhase)> {
        let index = self.index_of(pid)?;
        self.tasks.get(index).map(|task| (task.role, task.phase))
    }

    fn index_of(&self, pid: Pid) -> Option<usize> {
        self.core.processes.iter().position(|proc| proc.pid() == pid)
    }

    fn is_done(&self, index: usize) -> bool {
        self.tasks[index].rounds_done >= self.config.rounds
    }

    /// Takes `index` off the CPU until a signal or an unlock wakes it up
    fn block(&mut self, index: usize, on: &str) {
        let now = self.core.current_time;
        let pid = self.core.processes[index].pid();
        self.core.processes[index].state = ProcessState::Waiting;

        if !self.core.waiting.contains(&index) {
            self.core.waiting.push(index);
            self.core.log_event(format!("P{} → Waiting on {}", pid, on));
        }

        self.core.add_to_gantt(GanttOwner::Process(pid), now, now + 1, ProcessState::Waiting);
    }

    /// Makes a blocked process ready again in `phase`
    fn wake(&mut self, pid: Pid, phase: SyncPhase, by: &str) {
        let Some(index) = self.index_of(pid) else {
            return;
        };

        let now = self.core.current_time;
        self.core.waiting.retain(|&item| item != index);
        self.core.processes[index].mark_ready(now);
        self.core.ready.push(0, index);
        self.tasks[index].phase = phase;

        self.core.log_event(format!("P{} unblocked by {}", pid, by));
    }

    /// Plays one tick of the running process's round
    ///
    /// Returns whether the tick was spent on the CPU; acquiring, blocking and
    /// releasing do not count as CPU work.
    fn sync_step(&mut self, index: usize) -> bool {
        if self.is_done(index) {
            return false;
        }

        let pid = self.core.processes[index].pid();
        let task = self.tasks[index];

        match task.phase {
            SyncPhase::Idle => {
                let name = task.role.acquires();
                let acquired = self
                    .sync
                    .semaphore_mut(name)
                    .is_some_and(|sem| sem.wait(pid));

                if acquired {
                    self.tasks[index].phase = SyncPhase::WaitMutex;
                    self.core
                        .log_event(format!("P{} ({}) acquired {}", pid, task.role.label(), name));
                } else {
                    self.block(index, name);
                }

                false
            }

            SyncPhase::WaitMutex => {
                let locked = self.sync.mutex_mut(MUTEX).is_some_and(|mutex| mutex.try_lock(pid));

                if locked {
                    self.tasks[index].phase = SyncPhase::Critical;
                    self.tasks[index].critical_ticks_done = 0;
                    self.core.log_event(format!("P{} acquired mutex → CRITICAL", pid));
                } else {
                    self.block(index, MUTEX);
                }

                false
            }

            SyncPhase::Critical if task.critical_ticks_done < self.config.critical_section_ticks => {
                self.tasks[index].critical_ticks_done += 1;
                true
            }

            SyncPhase::Critical => {
                self.leave_critical_section(index);
                false
            }

            SyncPhase::Done => false,
        }
    }

    /// Unlocks the mutex, signals the other side and closes the round
    fn leave_critical_section(&mut self, index: usize) {
        let pid = self.core.processes[index].pid();
        let role = self.tasks[index].role;

        if let Some(next_owner) = self.sync.mutex_mut(MUTEX).and_then(|mutex| mutex.unlock()) {
            /* ownership was handed over, the lock call will succeed by re-entry */
            self.wake(next_owner, SyncPhase::WaitMutex, MUTEX);
        }

        let signalled = role.releases();
        if let Some(woken) = self.sync.semaphore_mut(signalled).and_then(|sem| sem.signal()) {
            /* the signal handed the unit to the waiter */
            self.wake(woken, SyncPhase::WaitMutex, signalled);
        }

        let task = &mut self.tasks[index];
        task.rounds_done += 1;
        task.phase = if task.rounds_done >= self.config.rounds {
            SyncPhase::Done
        } else {
            SyncPhase::Idle
        };

        let rounds_done = task.rounds_done;
        self.core.log_event(format!("P{} round {} done", pid, rounds_done));
    }

    /// Runs the dispatched process for one tick and applies the outcome
    fn run_tick(&mut self, index: usize) -> Result<(), SimError> {
        let now = self.core.current_time;

        if self.sync_step(index) {
            self.core.span_start.get_or_insert(now);
            self.core.processes[index].execute(1)?;
            self.core.processes[index].time_slice_used += 1;
            self.core.stats.cpu_busy_time += 1;
        } else {
            /* lock and signal bookkeeping holds the CPU but is not burst time */
            self.core.flush_span(index, now);
        }

        if self.is_done(index) {
            self.core.flush_span(index, now + 1);
            self.core.processes[index].complete_current_burst();
            self.core.terminate(index, now + 1);
            self.core.cpu = Cpu::Idle;
        } else if self.core.processes[index].state() == ProcessState::Waiting {
            self.core.flush_span(index, now);
            self.core.cpu = Cpu::Idle;
        } else if self.core.processes[index].time_slice_used() >= self.config.time_slice.get() {
            self.core.flush_span(index, now + 1);

            let proc = &mut self.core.processes[index];
            proc.mark_ready(now + 1);
            proc.time_slice_used = 0;
            let pid = proc.pid();

            self.core.ready.push(0, index);
            self.core.cpu = Cpu::Idle;
            self.core.log_event(format!("P{} time slice expired", pid));
        }

        Ok(())
    }

    /// Looks for a cycle in the wait-for graph and aborts the lowest pid in it
    fn check_deadlock(&mut self) {
        self.report.deadlock_checks += 1;

        let cycle = self.sync.detect_deadlock();
        let Some(&victim) = cycle.iter().min() else {
            return;
        };

        self.report.deadlocks_detected += 1;
        let members: Vec<String> = cycle.iter().map(|pid| format!("P{}", pid)).collect();
        self.core
            .log_event(format!("DEADLOCK DETECTED! Cycle: [{}]", members.join(", ")));
        warn!("{}: deadlock between {}", self.core.name, members.join(", "));

        let Some(index) = self.index_of(victim) else {
            return;
        };
        if self.core.processes[index].state() != ProcessState::Waiting {
            return;
        }

        self.core
            .log_event(format!("DEADLOCK RECOVERY: Aborting P{}", victim));
        warn!("{}: aborting P{} to break the deadlock", self.core.name, victim);

        let now = self.core.current_time;
        let handed_over = self.sync.release_process(victim);

        self.core.waiting.retain(|&item| item != index);
        self.core.processes[index].aborted = true;
        self.tasks[index].phase = SyncPhase::Done;
        self.core.terminate(index, now);

        for pid in handed_over {
            self.wake(pid, SyncPhase::WaitMutex, MUTEX);
        }
    }
}

impl Scheduler for SyncDemo {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn execute_one_step(&mut self) -> Result<bool, SimError> {
        if self.core.is_complete() {
            self.core.finish();
            return Ok(true);
        }

        self.core.admit_arrivals();

        let mut switching = false;
        if let Cpu::Switching { .. } = self.core.cpu {
            self.core.advance_switch();
            switching = true;
        } else if self.core.cpu == Cpu::Idle {
            if let Some(index) = select_front(&self.core.ready).and_then(|slot| self.core.ready.remove(slot)) {
                switching = self.core.dispatch(index);
            }
        }

        if !switching {
            match self.core.running() {
                Some(index) => self.run_tick(index)?,
                None => self.core.record_idle_tick(),
            }
        }

        let interval = self.config.deadlock_check_interval;
        if interval > 0 && self.core.current_time % interval == 0 {
            self.check_deadlock();
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
        let mut result = self.core.results(Some(self.report));

        result.event_log.push(format!("Deadlock Checks: {}", self.report.deadlock_checks));
        result
            .event_log
            .push(format!("Deadlocks Detected: {}", self.report.deadlocks_detected));

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workload() -> Vec<ProcessDescriptor> {
        vec![
            ProcessDescriptor::new(1, 0, 6, vec![3]),
            ProcessDescriptor::new(2, 4, 2, vec![5, 2, 5]),
            ProcessDescriptor::new(3, 7, 9, vec![1]),
        ]
    }

    #[test]
    fn picks_one_producer_and_one_consumer() {
        let demo = SyncDemo::new(&workload(), &SyncDemoConfig::default(), &SimConfig::default());

        assert_eq!(demo.task_of(Pid::new(2)), Some((SyncRole::Producer, SyncPhase::Idle)));
        assert_eq!(demo.task_of(Pid::new(1)), Some((SyncRole::Consumer, SyncPhase::Idle)));
        assert_eq!(demo.task_of(Pid::new(3)), None);
    }

    #[test]
    fn both_sides_finish_every_round() {
        let mut demo = SyncDemo::new(&workload(), &SyncDemoConfig::default(), &SimConfig::default());
        let result = demo.run().unwrap();

        assert!(!result.timed_out);
        assert_eq!(result.processes.len(), 2);
        assert!(result.processes.iter().all(|proc| !proc.is_aborted()));
        assert_eq!(demo.task_of(Pid::new(1)).map(|(_, phase)| phase), Some(SyncPhase::Done));
        assert_eq!(demo.task_of(Pid::new(2)).map(|(_, phase)| phase), Some(SyncPhase::Done));

        /* every critical section tick is CPU work, nothing else is */
        let config = SyncDemoConfig::default();
        let expected_busy = u64::from(2 * config.rounds * config.critical_section_ticks);
        let busy = result.statistics.cpu_utilization_percent * result.total_time as f64 / 100.0;
        assert!((busy - expected_busy as f64).abs() < 1e-6);

        /* a single mutex can never close a cycle */
        let report = result.deadlock_report.unwrap();
        assert!(report.deadlock_checks > 0);
        assert_eq!(report.deadlocks_detected, 0);
    }

    #[test]
    fn running_spans_cover_only_critical_section_ticks() {
        let processes = [
            ProcessDescriptor::new(1, 0, 1, vec![4]),
            ProcessDescriptor::new(2, 0, 6, vec![4]),
        ];
        let mut demo = SyncDemo::new(&processes, &SyncDemoConfig::default(), &SimConfig::default());
        let result = demo.run().unwrap();

        for proc in &result.processes {
            let running: u64 = result
                .gantt_chart
                .iter()
                .filter(|entry| entry.owner == GanttOwner::Process(proc.pid()))
                .filter(|entry| entry.state == ProcessState::Running)
                .map(|entry| entry.duration())
                .sum();

            assert_eq!(running, proc.total_cpu_demand());
        }
    }

    #[test]
    fn deadlock_recovery_aborts_the_lowest_pid() {
        let processes = [
            ProcessDescriptor::new(1, 0, 1, vec![4]),
            ProcessDescriptor::new(2, 0, 6, vec![4]),
        ];
        let mut demo = SyncDemo::new(&processes, &SyncDemoConfig::default(), &SimConfig::default());

        demo.sync.mutex("a").try_lock(Pid::new(1));
        demo.sync.mutex("b").try_lock(Pid::new(2));
        demo.sync.mutex("a").try_lock(Pid::new(2));
        demo.sync.mutex("b").try_lock(Pid::new(1));
        for index in 0..2 {
            demo.core.processes[index].state = ProcessState::Waiting;
            demo.core.waiting.push(index);
        }

        demo.check_deadlock();

        let report = demo.deadlock_report();
        assert_eq!(report.deadlock_checks, 1);
        assert_eq!(report.deadlocks_detected, 1);

        let victim = &demo.core.processes[0];
        assert!(victim.is_aborted());
        assert_eq!(victim.state(), ProcessState::Terminated);
        assert_eq!(demo.core.terminated, vec![0]);
        assert!(!demo.core.waiting.contains(&0));
        assert_eq!(demo.task_of(Pid::new(1)).map(|(_, phase)| phase), Some(SyncPhase::Done));

        let log = &demo.core.event_log;
        assert!(log.iter().any(|line| line.ends_with("DEADLOCK DETECTED! Cycle: [P1, P2]")));
        assert!(log.iter().any(|line| line.ends_with("DEADLOCK RECOVERY: Aborting P1")));

        /* P2 inherits mutex "a" and goes back to the ready queue */
        assert_eq!(demo.sync.get_mutex("a").and_then(|mutex| mutex.owner()), Some(Pid::new(2)));
        assert!(demo.core.ready.level(0).is_some_and(|queue| queue.contains(&1)));
        assert!(demo.core.waiting.is_empty());
        assert_eq!(demo.task_of(Pid::new(2)).map(|(_, phase)| phase), Some(SyncPhase::WaitMutex));

        assert!(demo.sync.detect_deadlock().is_empty());
    }

    #[test]
    fn buffer_bounds_producer_lead() {
        let mut demo = SyncDemo::new(&workload(), &SyncDemoConfig::default(), &SimConfig::default());

        while !demo.execute_one_step().unwrap() {
            let full = demo.sync_manager().get_semaphore(FULL).map(|sem| sem.count()).unwrap();
            let empty = demo.sync_manager().get_semaphore(EMPTY).map(|sem| sem.count()).unwrap();
            assert!(full + empty <= 3);
        }
    }

    #[test]
    fn single_process_times_out_softly() {
        let config = SyncDemoConfig::default().with_tick_limit(200);
        let mut demo = SyncDemo::new(
            &[ProcessDescriptor::new(1, 0, 1, vec![4])],
            &config,
            &SimConfig::default(),
        );

        let result = demo.run().unwrap();
        assert!(result.timed_out);
        assert!(result.processes.is_empty());
        assert!(result.event_log.iter().any(|line| line.contains("Simulation timeout")));
    }

    #[test]
    fn empty_set_completes_immediately() {
        let mut demo = SyncDemo::new(&[], &SyncDemoConfig::default(), &SimConfig::default());

        assert_eq!(demo.execute_one_step(), Ok(true));
        assert_eq!(demo.get_current_snapshot().time, 0);
    }
}
