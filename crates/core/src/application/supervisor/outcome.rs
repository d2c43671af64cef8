// Supervisor results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::domain::{Liveness, ProcessId, SupervisorState};

/// How `stop` ended. Every variant leaves the state file removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// No state file
    NotRunning,
    /// SIGTERM delivered
    Signaled(ProcessId),
    /// Recorded process no longer existed
    AlreadyExited(ProcessId),
    /// State file content was not a pid
    CorruptState { content: String },
    /// Signal delivery failed for a reason other than "no such process"
    SignalFailed { pid: ProcessId, reason: String },
    /// State file existed but could not be read
    Unreadable { reason: String },
}

/// Read-only snapshot for `status`
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorStatus {
    pub state: SupervisorState,
    pub state_file: PathBuf,
    pub pid: Option<ProcessId>,
    pub liveness: Option<Liveness>,
    /// Raw content when the state file does not hold a pid
    pub corrupt_content: Option<String>,
    /// State file modification time
    pub recorded_at: Option<DateTime<Utc>>,
}

impl SupervisorStatus {
    /// State file present but its process is gone, foreign, or unknown
    pub fn is_stale(&self) -> bool {
        self.state == SupervisorState::Running
            && !self
                .liveness
                .as_ref()
                .is_some_and(Liveness::is_recognized_server)
    }
}
