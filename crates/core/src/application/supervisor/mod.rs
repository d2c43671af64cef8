// Process Supervisor - start/stop state machine over a single state file

mod outcome;

pub use outcome::{StopOutcome, SupervisorStatus};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::{
    Liveness, OccupancyPolicy, ProcessHandle, ProcessId, ServerLaunchConfig, SupervisionPolicy,
    SupervisorState,
};
use crate::error::{AppError, Result};
use crate::port::{ProcessLauncher, ProcessRegistry, RegistryError, TerminateOutcome};

/// Process supervisor
///
/// Holds no state between invocations: every call re-reads the registry.
pub struct ProcessSupervisor {
    registry: Arc<dyn ProcessRegistry>,
    launcher: Arc<dyn ProcessLauncher>,
    occupancy: OccupancyPolicy,
    supervision: SupervisionPolicy,
}

impl ProcessSupervisor {
    /// Create a supervisor with the conservative defaults
    /// (`OccupancyPolicy::FileExists`, `SupervisionPolicy::None`)
    ///
    /// # Example
    /// ```ignore
    /// let supervisor = ProcessSupervisor::new(
    ///     Arc::new(FileProcessRegistry::new(root.join("vllm_server.pid"))),
    ///     Arc::new(DetachedLauncher::new()),
    /// )
    /// .with_occupancy_policy(OccupancyPolicy::VerifyLiveness);
    /// ```
    pub fn new(registry: Arc<dyn ProcessRegistry>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            registry,
            launcher,
            occupancy: OccupancyPolicy::default(),
            supervision: SupervisionPolicy::default(),
        }
    }

    pub fn with_occupancy_policy(mut self, policy: OccupancyPolicy) -> Self {
        self.occupancy = policy;
        self
    }

    pub fn with_supervision_policy(mut self, policy: SupervisionPolicy) -> Self {
        self.supervision = policy;
        self
    }

    /// Start the server and record its pid
    ///
    /// Steps:
    /// 1. Refuse if the state file is occupied (per `OccupancyPolicy`)
    /// 2. Refuse if the model path does not exist
    /// 3. Reclaim a stale state file (`VerifyLiveness` only), then reserve it
    ///    (exclusive create)
    /// 4. Spawn detached; release the reservation on failure
    /// 5. Record the pid before returning
    ///
    /// Nothing on disk changes before step 3, so a refusal in steps 1-2
    /// leaves the state file as it was.
    ///
    /// # Errors
    /// - AppError::AlreadyTracked if a state file is present (state untouched)
    /// - AppError::MissingArtifact if `config.model_path` is absent
    /// - AppError::Launch if the spawn fails
    /// - AppError::Untracked if the child runs but its pid could not be written
    pub async fn start(&self, config: &ServerLaunchConfig) -> Result<ProcessHandle> {
        config.validate()?;
        let reclaim = self.check_vacancy()?;

        if !config.model_path.exists() {
            return Err(AppError::MissingArtifact(config.model_path.clone()));
        }
        let mut config = config.clone();
        config.model_path = std::fs::canonicalize(&config.model_path)?;

        if reclaim {
            warn!(
                state_file = %self.registry.path().display(),
                "Reclaiming stale state file"
            );
            self.registry.release()?;
        }

        let state = SupervisorState::Stopped.transition(SupervisorState::Starting)?;
        debug!(state = %state, "Supervisor transition");

        if !self.registry.try_acquire()? {
            warn!(
                state_file = %self.registry.path().display(),
                "State file appeared while starting, refusing"
            );
            return Err(AppError::AlreadyTracked(self.registry.path().to_path_buf()));
        }

        let command = config.to_command();
        info!(
            command = %command,
            model_path = %config.model_path.display(),
            port = %config.port,
            served_model_name = %config.served_model_name,
            tensor_parallel_size = %config.tensor_parallel_size,
            log_file = ?config.log_file,
            "Launching model server"
        );

        let pid = match self.launcher.spawn(&command).await {
            Ok(pid) => pid,
            Err(e) => {
                if let Err(release_err) = self.registry.release() {
                    warn!(error = %release_err, "Failed to release state file after spawn failure");
                }
                state.transition(SupervisorState::Stopped)?;
                return Err(e.into());
            }
        };

        if let Err(source) = self.registry.record(pid) {
            error!(
                pid = %pid,
                state_file = %self.registry.path().display(),
                error = %source,
                "Server is running but its pid could not be recorded; stop it manually"
            );
            return Err(AppError::Untracked { pid, source });
        }

        let state = state.transition(SupervisorState::Running)?;
        self.apply_supervision(pid);

        info!(
            pid = %pid,
            state = %state,
            state_file = %self.registry.path().display(),
            "Model server started in background"
        );

        Ok(ProcessHandle {
            pid,
            state_file: self.registry.path().to_path_buf(),
            command,
        })
    }

    /// Stop the recorded server
    ///
    /// Sends one graceful termination signal and does not wait for exit.
    /// The state file is deleted on every path; only a failure to delete it
    /// is reported as an error.
    pub async fn stop(&self) -> Result<StopOutcome> {
        let outcome = match self.registry.read_recorded() {
            Ok(None) => {
                info!(
                    state_file = %self.registry.path().display(),
                    "No state file, server is probably not running"
                );
                StopOutcome::NotRunning
            }
            Ok(Some(pid)) => self.signal(pid).await,
            Err(RegistryError::Corrupt { content, .. }) => {
                warn!(content = %content, "State file content is invalid, discarding");
                StopOutcome::CorruptState { content }
            }
            Err(e) => {
                warn!(error = %e, "State file could not be read, discarding");
                StopOutcome::Unreadable {
                    reason: e.to_string(),
                }
            }
        };

        self.registry.release()?;
        if outcome != StopOutcome::NotRunning {
            info!(state_file = %self.registry.path().display(), "State file removed");
        }
        debug!(state = %SupervisorState::Stopped, "Supervisor transition");

        Ok(outcome)
    }

    /// Report what the state file says and what the OS says about it
    pub fn status(&self) -> Result<SupervisorStatus> {
        let (pid, corrupt_content) = match self.registry.read_recorded() {
            Ok(pid) => (pid, None),
            Err(RegistryError::Corrupt { content, .. }) => (None, Some(content)),
            Err(e) => return Err(e.into()),
        };

        let present = pid.is_some() || corrupt_content.is_some();
        let liveness = pid.map(|pid| self.launcher.inspect(pid));
        let recorded_at = self.registry.recorded_at().map(DateTime::<Utc>::from);

        Ok(SupervisorStatus {
            state: SupervisorState::from_state_file(present),
            state_file: self.registry.path().to_path_buf(),
            pid,
            liveness,
            corrupt_content,
            recorded_at: recorded_at.filter(|_| present),
        })
    }

    /// Enforce the occupancy policy without touching the state file.
    ///
    /// `Ok(true)` means a stale record is present and may be reclaimed.
    fn check_vacancy(&self) -> Result<bool> {
        match self.occupancy {
            OccupancyPolicy::FileExists => {
                if self.registry.is_present()? {
                    warn!(
                        state_file = %self.registry.path().display(),
                        "State file exists, a server is possibly already running"
                    );
                    return Err(AppError::AlreadyTracked(self.registry.path().to_path_buf()));
                }
                Ok(false)
            }
            OccupancyPolicy::VerifyLiveness => self.is_stale_record(),
        }
    }

    /// `VerifyLiveness`: keep the record only if it names a live, recognizable server
    fn is_stale_record(&self) -> Result<bool> {
        match self.registry.read_recorded() {
            Ok(None) => Ok(false),
            Ok(Some(pid)) => {
                let liveness = self.launcher.inspect(pid);

                // Unknown cannot prove the process is gone
                if liveness.is_recognized_server() || liveness == Liveness::Unknown {
                    warn!(pid = %pid, liveness = ?liveness, "Recorded server is still running");
                    return Err(AppError::AlreadyTracked(self.registry.path().to_path_buf()));
                }

                info!(
                    pid = %pid,
                    liveness = ?liveness,
                    "Recorded pid is not a running server"
                );
                Ok(true)
            }
            Err(RegistryError::Corrupt { content, .. }) => {
                info!(content = %content, "State file content is invalid");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn signal(&self, pid: ProcessId) -> StopOutcome {
        info!(pid = %pid, "Stopping model server");
        match self.launcher.terminate(pid).await {
            Ok(TerminateOutcome::Signaled) => {
                info!(pid = %pid, "SIGTERM sent");
                StopOutcome::Signaled(pid)
            }
            Ok(TerminateOutcome::NotFound) => {
                info!(pid = %pid, "Process does not exist, it probably already exited");
                StopOutcome::AlreadyExited(pid)
            }
            Err(e) => {
                warn!(pid = %pid, error = %e, "Failed to signal process");
                StopOutcome::SignalFailed {
                    pid,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn apply_supervision(&self, pid: ProcessId) {
        match self.supervision {
            SupervisionPolicy::None => {
                debug!(pid = %pid, "Supervision policy: none (child is not monitored)");
            }
        }
    }
}
