//! The scheduling policies
//!
//! Every policy but the sync demo is a [`SchedulingPolicy`](crate::SchedulingPolicy)
//! run by the shared engine.

mod fcfs;
pub use fcfs::Fcfs;

mod srtf;
pub use srtf::Srtf;

mod round_robin;
pub use round_robin::RoundRobin;

mod priority;
pub use priority::{PriorityAging, StaticPriority};

mod mlq;
pub use mlq::{level_after, quantum, LevelEvent, MultilevelQueue, MLQ_LEVELS};

mod rate_monotonic;
pub use rate_monotonic::RateMonotonic;

mod edf;
pub use edf::Edf;

mod sync_demo;
pub use sync_demo::{SyncDemo, SyncPhase, SyncRole};
