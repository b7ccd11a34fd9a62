use serde::Serialize;

use crate::{GanttEntry, Process, Tick};

/// Counters accumulated while the simulation runs
#[derive(Clone, Debug, Default)]
pub struct SchedulerStats {
    pub context_switches: u64,
    pub cpu_busy_time: Tick,
}

/// Aggregate performance of one run
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub avg_waiting_time: f64,
    pub avg_turnaround_time: f64,
    pub avg_response_time: f64,
    pub cpu_utilization_percent: f64,
    pub context_switches: u64,
}

impl SchedulerStats {
    /// Averages over the terminated processes
    ///
    /// * `terminated` - processes that left the system
    /// * `elapsed` - simulated time of the run
    pub fn summarize<'a>(&self, terminated: impl IntoIterator<Item = &'a Process>, elapsed: Tick) -> Statistics {
        let mut count = 0u64;
        let mut waiting = 0u64;
        let mut turnaround = 0u64;
        let mut response = 0u64;

        for proc in terminated {
            count += 1;
            waiting += proc.waiting_time();
            turnaround += proc.turnaround_time();
            response += proc.response_time().unwrap_or(0);
        }

        let utilization = if elapsed > 0 {
            self.cpu_busy_time as f64 / elapsed as f64 * 100.0
        } else {
            0.0
        };

        if count == 0 {
            return Statistics {
                cpu_utilization_percent: utilization,
                context_switches: self.context_switches,
                ..Statistics::default()
            };
        }

        Statistics {
            avg_waiting_time: waiting as f64 / count as f64,
            avg_turnaround_time: turnaround as f64 / count as f64,
            avg_response_time: response as f64 / count as f64,
            cpu_utilization_percent: utilization,
            context_switches: self.context_switches,
        }
    }
}

/// Everything a run produced, handed to reporting collaborators
#[derive(Clone, Debug, Serialize)]
pub struct SimulationResult {
    pub algorithm: String,
    pub statistics: Statistics,
    pub gantt_chart: Vec<GanttEntry>,
    pub event_log: Vec<String>,
    /// Terminated processes in termination order
    pub processes: Vec<Process>,
    pub total_time: Tick,
    /// The run hit its tick limit before every process terminated
    pub timed_out: bool,
    /// Only filled by the producer-consumer demo
    pub deadlock_report: Option<DeadlockReport>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeadlockReport {
    pub deadlock_checks: u64,
    pub deadlocks_detected: u64,
}
