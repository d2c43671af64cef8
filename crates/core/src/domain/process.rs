// Process Domain Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::SERVER_ENTRYPOINT;
use super::error::{DomainError, Result};
use super::launch::LaunchCommand;

/// OS process identifier as recorded in the state file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Returns `None` for 0, which never names a child process
    pub fn new(raw: u32) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// For signal APIs that take a signed pid
    pub fn as_i32(&self) -> Option<i32> {
        i32::try_from(self.0).ok()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProcessId {
    type Err = DomainError;

    /// Surrounding whitespace is tolerated; anything else must be a decimal pid
    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(ProcessId::new)
            .filter(|pid| pid.as_i32().is_some())
            .ok_or_else(|| DomainError::InvalidProcessId(s.to_string()))
    }
}

/// A supervised child: its pid, the state file that owns it, and the
/// command it was actually started with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessHandle {
    pub pid: ProcessId,
    pub state_file: PathBuf,
    pub command: LaunchCommand,
}

/// Supervisor lifecycle. Only `Stopped` and `Running` are ever observed from
/// disk; the other two exist for the duration of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl SupervisorState {
    /// Infer the state from state-file presence
    pub fn from_state_file(present: bool) -> Self {
        if present {
            SupervisorState::Running
        } else {
            SupervisorState::Stopped
        }
    }

    /// Validate and apply a transition
    pub fn transition(self, to: SupervisorState) -> Result<SupervisorState> {
        use SupervisorState::*;

        let allowed = matches!(
            (self, to),
            (Stopped, Starting)
                | (Starting, Running)
                | (Starting, Stopped)
                | (Running, Stopping)
                | (Stopping, Stopped)
        );

        if allowed {
            Ok(to)
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::Stopped => write!(f, "STOPPED"),
            SupervisorState::Starting => write!(f, "STARTING"),
            SupervisorState::Running => write!(f, "RUNNING"),
            SupervisorState::Stopping => write!(f, "STOPPING"),
        }
    }
}

/// What the OS says about a pid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Liveness {
    /// Process exists; `command` is its argv as far as the OS exposes it
    Running { command: Vec<String> },
    /// Exited but not yet reaped
    Zombie,
    Gone,
    /// Could not be determined on this platform
    Unknown,
}

impl Liveness {
    /// Running and its command line names the server entrypoint
    pub fn is_recognized_server(&self) -> bool {
        match self {
            Liveness::Running { command } => {
                command.iter().any(|arg| arg.contains(SERVER_ENTRYPOINT))
            }
            _ => false,
        }
    }
}

/// How `start` decides the state file is occupied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyPolicy {
    /// State file present means running, whatever its content.
    /// A stale file left after a crash blocks `start` until `stop` is run.
    #[default]
    FileExists,
    /// Reclaim the state file unless the recorded pid is a live, recognizable server
    VerifyLiveness,
}

/// What happens to the child after a successful spawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisionPolicy {
    /// Fire and forget: no monitoring, no waiting, no restart
    #[default]
    None,
}
