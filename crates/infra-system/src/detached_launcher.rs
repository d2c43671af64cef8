// Detached process launcher
// reason: tokio for process spawning, nix for signals, sysinfo for inspection
use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::process::Stdio;
use sysinfo::{ProcessStatus, System};
use tokio::process::Command;
use tracing::{debug, info};

use modelhost_core::domain::{LaunchCommand, Liveness, ProcessId};
use modelhost_core::port::process_launcher::{LaunchError, ProcessLauncher, TerminateOutcome};

/// Spawns children that outlive the invoking command
///
/// The child gets its own process group (so a Ctrl+C in the launching
/// terminal does not reach it), a null stdin, and either the log file or the
/// inherited stdout/stderr. The `Child` handle is dropped right after spawn.
#[derive(Debug, Default)]
pub struct DetachedLauncher;

impl DetachedLauncher {
    pub fn new() -> Self {
        Self
    }

    fn open_log(path: &Path) -> Result<File, LaunchError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| LaunchError::IoError(e.to_string()))?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LaunchError::IoError(format!("{}: {}", path.display(), e)))
    }

    fn output_streams(command: &LaunchCommand) -> Result<(Stdio, Stdio), LaunchError> {
        match &command.log_file {
            Some(path) => {
                let stdout = Self::open_log(path)?;
                let stderr = stdout
                    .try_clone()
                    .map_err(|e| LaunchError::IoError(e.to_string()))?;
                Ok((Stdio::from(stdout), Stdio::from(stderr)))
            }
            None => Ok((Stdio::inherit(), Stdio::inherit())),
        }
    }
}

#[async_trait]
impl ProcessLauncher for DetachedLauncher {
    async fn spawn(&self, command: &LaunchCommand) -> Result<ProcessId, LaunchError> {
        let (stdout, stderr) = Self::output_streams(command)?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(false);

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| {
            LaunchError::SpawnFailed(format!("{}: {}", command.program, e))
        })?;

        let pid = child
            .id()
            .and_then(ProcessId::new)
            .ok_or(LaunchError::MissingPid)?;

        info!(pid = %pid, program = %command.program, "Process spawned (detached)");

        // Dropping the handle does not kill the child
        drop(child);

        Ok(pid)
    }

    async fn terminate(&self, pid: ProcessId) -> Result<TerminateOutcome, LaunchError> {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let raw = pid.as_i32().ok_or_else(|| LaunchError::SignalFailed {
                pid,
                reason: "pid out of range".to_string(),
            })?;

            info!(pid = %pid, "Sending SIGTERM");
            match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) => Ok(TerminateOutcome::Signaled),
                Err(Errno::ESRCH) => Ok(TerminateOutcome::NotFound),
                Err(e) => Err(LaunchError::SignalFailed {
                    pid,
                    reason: e.to_string(),
                }),
            }
        }

        #[cfg(windows)]
        {
            // Windows: taskkill without /F asks the process to close
            info!(pid = %pid, "Requesting process termination on Windows");
            let output = tokio::process::Command::new("taskkill")
                .args(["/PID", &pid.to_string()])
                .output()
                .await
                .map_err(|e| LaunchError::SignalFailed {
                    pid,
                    reason: e.to_string(),
                })?;

            if output.status.success() {
                return Ok(TerminateOutcome::Signaled);
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("not found") {
                Ok(TerminateOutcome::NotFound)
            } else {
                Err(LaunchError::SignalFailed {
                    pid,
                    reason: stderr.trim().to_string(),
                })
            }
        }
    }

    fn inspect(&self, pid: ProcessId) -> Liveness {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Liveness::Unknown;
        }

        let sys_pid = sysinfo::Pid::from_u32(pid.as_u32());
        let mut system = System::new();
        if !system.refresh_process(sys_pid) {
            debug!(pid = %pid, "Process not found");
            return Liveness::Gone;
        }

        match system.process(sys_pid) {
            Some(process) if process.status() == ProcessStatus::Zombie => Liveness::Zombie,
            Some(process) => Liveness::Running {
                command: process.cmd().to_vec(),
            },
            None => Liveness::Gone,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sleep_command(log_file: Option<&Path>) -> LaunchCommand {
        LaunchCommand {
            program: "sleep".to_string(),
            args: vec!["30".to_string()],
            log_file: log_file.map(Path::to_path_buf),
        }
    }

    #[tokio::test]
    async fn test_spawn_inspect_terminate() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs").join("server.log");
        let launcher = DetachedLauncher::new();

        let pid = launcher.spawn(&sleep_command(Some(&log))).await.unwrap();
        assert!(log.exists());

        match launcher.inspect(pid) {
            Liveness::Running { command } => {
                assert!(command.iter().any(|arg| arg.contains("sleep")));
            }
            other => panic!("expected running process, got {:?}", other),
        }

        let outcome = launcher.terminate(pid).await.unwrap();
        assert_eq!(outcome, TerminateOutcome::Signaled);

        let mut exited = false;
        for _ in 0..50 {
            if !matches!(launcher.inspect(pid), Liveness::Running { .. }) {
                exited = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(exited, "process should exit after SIGTERM");
    }

    #[tokio::test]
    async fn test_terminate_missing_process() {
        let launcher = DetachedLauncher::new();
        let pid = ProcessId::new(i32::MAX as u32).unwrap();

        let outcome = tokio_test::assert_ok!(launcher.terminate(pid).await);
        assert_eq!(outcome, TerminateOutcome::NotFound);
        assert_eq!(launcher.inspect(pid), Liveness::Gone);
    }

    #[tokio::test]
    async fn test_spawn_missing_program() {
        let launcher = DetachedLauncher::new();
        let command = LaunchCommand {
            program: "/nonexistent/modelhost-test-binary".to_string(),
            args: vec![],
            log_file: None,
        };

        let result = launcher.spawn(&command).await;
        assert!(matches!(result, Err(LaunchError::SpawnFailed(_))));
    }
}
