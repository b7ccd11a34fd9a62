use thiserror::Error;

use crate::Pid;

/// Contract violations raised by the engine.
///
/// None of these can happen while the engine and the policies behave; seeing
/// one means a policy handed the engine a process in the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("P{pid} cannot execute: burst {burst_index} is not a CPU burst")]
    NotOnCpuBurst { pid: Pid, burst_index: usize },

    #[error("P{pid} cannot start I/O: burst {burst_index} is not an I/O burst")]
    NotOnIoBurst { pid: Pid, burst_index: usize },

    #[error("P{pid} has already terminated")]
    AlreadyTerminated { pid: Pid },
}
