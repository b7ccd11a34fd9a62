use std::fmt;

use serde::{Deserialize, Serialize};

/// Simulated time, measured in ticks since the start of the run
pub type Tick = u64;

/// Gantt sentinel for a tick where the CPU had nothing to do
pub const IDLE_SENTINEL: i64 = -1;
/// Gantt sentinel for a tick spent switching between two processes
pub const CONTEXT_SWITCH_SENTINEL: i64 = -2;

/// Process identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(u32);

impl Pid {
    /// Creates a new Pid object
    ///
    /// * `pid` - the numeric identifier, expected to be positive
    pub fn new(pid: u32) -> Pid {
        Pid(pid)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The states a process moves through during a simulation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    Ready,
    Running,
    /// Doing I/O, or blocked on a semaphore or mutex in the sync demo
    Waiting,
    Terminated,
    /// Selected for the CPU, waiting for the switch overhead to elapse
    ContextSwitching,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessState::Ready => "Ready",
            ProcessState::Running => "Running",
            ProcessState::Waiting => "Waiting",
            ProcessState::Terminated => "Terminated",
            ProcessState::ContextSwitching => "Context Switching",
        };

        f.write_str(label)
    }
}

/// What occupied a Gantt interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GanttOwner {
    Process(Pid),
    Idle,
    ContextSwitch,
}

impl GanttOwner {
    /// Returns the integer encoding used by downstream renderers: the pid
    /// itself, `-1` for idle and `-2` for a context switch
    pub fn sentinel(&self) -> i64 {
        match self {
            GanttOwner::Process(pid) => i64::from(pid.get()),
            GanttOwner::Idle => IDLE_SENTINEL,
            GanttOwner::ContextSwitch => CONTEXT_SWITCH_SENTINEL,
        }
    }

    pub fn pid(&self) -> Option<Pid> {
        match self {
            GanttOwner::Process(pid) => Some(*pid),
            _ => None,
        }
    }
}

/// One interval of the Gantt trace, `start < end` always holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GanttEntry {
    pub owner: GanttOwner,
    pub start: Tick,
    pub end: Tick,
    pub state: ProcessState,
}

impl GanttEntry {
    pub fn duration(&self) -> Tick {
        self.end - self.start
    }
}
