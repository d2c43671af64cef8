// Process Launcher Port
// Abstraction for spawning, signalling and inspecting OS processes

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{LaunchCommand, Liveness, ProcessId};

/// Result of a termination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// Graceful termination signal delivered
    Signaled,
    /// No process with that pid exists
    NotFound,
}

/// Launch errors
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Spawned process reported no pid")]
    MissingPid,

    #[error("Signal to PID {pid} failed: {reason}")]
    SignalFailed { pid: ProcessId, reason: String },

    #[error("IO error: {0}")]
    IoError(String),
}

/// Process Launcher trait
///
/// Implementations:
/// - DetachedLauncher: spawns a child that outlives the invoking command
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Spawn the command detached and return its pid without waiting on it
    ///
    /// # Errors
    /// - LaunchError::SpawnFailed if the program cannot be started
    async fn spawn(&self, command: &LaunchCommand) -> Result<ProcessId, LaunchError>;

    /// Send one graceful termination signal; never waits for exit
    ///
    /// # Errors
    /// - LaunchError::SignalFailed for any failure other than "no such process"
    async fn terminate(&self, pid: ProcessId) -> Result<TerminateOutcome, LaunchError>;

    /// Inspect a pid without side effects
    fn inspect(&self, pid: ProcessId) -> Liveness;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Mock termination behavior
    #[derive(Debug, Clone)]
    pub enum MockTerminate {
        Signaled,
        NotFound,
        Fail(String),
    }

    /// Mock Process Launcher for testing
    pub struct MockProcessLauncher {
        next_pid: Arc<Mutex<u32>>,
        spawn_failure: Arc<Mutex<Option<String>>>,
        terminate: Arc<Mutex<MockTerminate>>,
        liveness: Arc<Mutex<HashMap<u32, Liveness>>>,
        spawned: Arc<Mutex<Vec<LaunchCommand>>>,
        terminated: Arc<Mutex<Vec<ProcessId>>>,
    }

    impl MockProcessLauncher {
        pub fn new(first_pid: u32) -> Self {
            Self {
                next_pid: Arc::new(Mutex::new(first_pid)),
                spawn_failure: Arc::new(Mutex::new(None)),
                terminate: Arc::new(Mutex::new(MockTerminate::Signaled)),
                liveness: Arc::new(Mutex::new(HashMap::new())),
                spawned: Arc::new(Mutex::new(Vec::new())),
                terminated: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn fail_spawn(&self, message: impl Into<String>) {
            *self.spawn_failure.lock().unwrap() = Some(message.into());
        }
        pub fn set_terminate(&self, behavior: MockTerminate) {
            *self.terminate.lock().unwrap() = behavior;
        }
        pub fn set_liveness(&self, pid: u32, liveness: Liveness) {
            self.liveness.lock().unwrap().insert(pid, liveness);
        }
        pub fn spawn_count(&self) -> usize {
            self.spawned.lock().unwrap().len()
        }
        pub fn spawned(&self) -> Vec<LaunchCommand> {
            self.spawned.lock().unwrap().clone()
        }
        pub fn terminated(&self) -> Vec<ProcessId> {
            self.terminated.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessLauncher for MockProcessLauncher {
        async fn spawn(&self, command: &LaunchCommand) -> Result<ProcessId, LaunchError> {
            if let Some(msg) = self.spawn_failure.lock().unwrap().clone() {
                return Err(LaunchError::SpawnFailed(msg));
            }

            self.spawned.lock().unwrap().push(command.clone());

            let mut next = self.next_pid.lock().unwrap();
            let pid = ProcessId::new(*next).ok_or(LaunchError::MissingPid)?;
            *next += 1;
            Ok(pid)
        }

        async fn terminate(&self, pid: ProcessId) -> Result<TerminateOutcome, LaunchError> {
            self.terminated.lock().unwrap().push(pid);

            match self.terminate.lock().unwrap().clone() {
                MockTerminate::Signaled => Ok(TerminateOutcome::Signaled),
                MockTerminate::NotFound => Ok(TerminateOutcome::NotFound),
                MockTerminate::Fail(reason) => Err(LaunchError::SignalFailed { pid, reason }),
            }
        }

        fn inspect(&self, pid: ProcessId) -> Liveness {
            self.liveness
                .lock()
                .unwrap()
                .get(&pid.as_u32())
                .cloned()
                .unwrap_or(Liveness::Gone)
        }
    }
}
