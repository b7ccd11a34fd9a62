use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::Tick;

const DEFAULT_QUANTUM: NonZeroU32 = match NonZeroU32::new(4) {
    Some(quantum) => quantum,
    None => unreachable!(),
};

const DEFAULT_AGING_FACTOR: NonZeroU32 = match NonZeroU32::new(10) {
    Some(factor) => factor,
    None => unreachable!(),
};

/// Tunables shared by every scheduling policy.
///
/// Passed by value at construction, so changing it between runs never
/// affects a run already in progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks billed every time the CPU changes occupant, 0 disables billing
    pub context_switch_overhead: u32,
    /// Round Robin time quantum
    pub time_quantum: NonZeroU32,
    /// Ticks of waiting needed to gain one priority level
    pub aging_factor: NonZeroU32,
    /// Runs that have not finished past this tick are stopped
    pub tick_limit: Tick,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            context_switch_overhead: 1,
            time_quantum: DEFAULT_QUANTUM,
            aging_factor: DEFAULT_AGING_FACTOR,
            tick_limit: 10_000,
        }
    }
}

impl SimConfig {
    pub fn with_context_switch_overhead(mut self, overhead: u32) -> Self {
        self.context_switch_overhead = overhead;
        self
    }

    pub fn with_time_quantum(mut self, quantum: NonZeroU32) -> Self {
        self.time_quantum = quantum;
        self
    }

    pub fn with_aging_factor(mut self, factor: NonZeroU32) -> Self {
        self.aging_factor = factor;
        self
    }

    pub fn with_tick_limit(mut self, limit: Tick) -> Self {
        self.tick_limit = limit;
        self
    }
}

/// Parameters of the producer-consumer demonstration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncDemoConfig {
    /// Initial count of the `empty` semaphore
    pub buffer_size: u32,
    /// Critical sections each process has to go through
    pub rounds: u32,
    pub time_slice: NonZeroU32,
    /// CPU ticks spent inside one critical section
    pub critical_section_ticks: u32,
    /// The wait-for graph is checked every this many ticks
    pub deadlock_check_interval: Tick,
    pub tick_limit: Tick,
}

impl Default for SyncDemoConfig {
    fn default() -> Self {
        SyncDemoConfig {
            buffer_size: 3,
            rounds: 5,
            time_slice: DEFAULT_QUANTUM,
            critical_section_ticks: 2,
            deadlock_check_interval: 10,
            tick_limit: 5_000,
        }
    }
}

impl SyncDemoConfig {
    pub fn with_buffer_size(mut self, size: u32) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_tick_limit(mut self, limit: Tick) -> Self {
        self.tick_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_reference_setup() {
        let config = SimConfig::default();
        assert_eq!(config.context_switch_overhead, 1);
        assert_eq!(config.time_quantum.get(), 4);
        assert_eq!(config.aging_factor.get(), 10);
        assert_eq!(config.tick_limit, 10_000);

        let demo = SyncDemoConfig::default();
        assert_eq!((demo.buffer_size, demo.rounds), (3, 5));
        assert_eq!(demo.tick_limit, 5_000);
    }

    #[test]
    fn builders_override_single_fields() {
        let config = SimConfig::default()
            .with_context_switch_overhead(0)
            .with_tick_limit(50);

        assert_eq!(config.context_switch_overhead, 0);
        assert_eq!(config.tick_limit, 50);
        assert_eq!(config.time_quantum.get(), 4);
    }
}
