//! Supervisor with real processes
//!
//! A shell script stands in for the Python interpreter, so the spawned
//! command line carries the server entrypoint without vLLM installed.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use modelhost_core::application::{ProcessSupervisor, StopOutcome};
use modelhost_core::domain::{Liveness, OccupancyPolicy, ServerLaunchConfig, SupervisorState};
use modelhost_core::port::ProcessLauncher;
use modelhost_infra_system::{DetachedLauncher, FileProcessRegistry};

const FAKE_INTERPRETER: &str = "#!/bin/sh\ntrap 'kill $! 2>/dev/null; exit 0' TERM\nsleep 30 &\nwait\n";

struct Workspace {
    _root: tempfile::TempDir,
    state_file: PathBuf,
    server_log: PathBuf,
    model_dir: PathBuf,
    interpreter: PathBuf,
}

fn workspace() -> Workspace {
    let root = tempfile::tempdir().unwrap();
    let model_dir = root.path().join("models").join("Qwen3-8B");
    fs::create_dir_all(&model_dir).unwrap();

    let interpreter = root.path().join("fake-python");
    fs::write(&interpreter, FAKE_INTERPRETER).unwrap();
    fs::set_permissions(&interpreter, fs::Permissions::from_mode(0o755)).unwrap();

    Workspace {
        state_file: root.path().join("vllm_server.pid"),
        server_log: root.path().join("vllm_server.log"),
        model_dir,
        interpreter,
        _root: root,
    }
}

fn supervisor(state_file: &Path) -> ProcessSupervisor {
    ProcessSupervisor::new(
        Arc::new(FileProcessRegistry::new(state_file)),
        Arc::new(DetachedLauncher::new()),
    )
}

fn launch_config(ws: &Workspace) -> ServerLaunchConfig {
    ServerLaunchConfig::new(&ws.model_dir)
        .with_port(9000)
        .with_interpreter(ws.interpreter.display().to_string())
        .with_log_file(&ws.server_log)
}

async fn wait_until_gone(launcher: &DetachedLauncher, pid: modelhost_core::domain::ProcessId) -> bool {
    for _ in 0..50 {
        if !matches!(launcher.inspect(pid), Liveness::Running { .. }) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn test_start_status_stop_real_process() {
    let ws = workspace();

    let handle = supervisor(&ws.state_file)
        .start(&launch_config(&ws))
        .await
        .unwrap();
    assert_eq!(
        fs::read_to_string(&ws.state_file).unwrap(),
        handle.pid.to_string()
    );
    assert!(ws.server_log.exists());

    let status = supervisor(&ws.state_file).status().unwrap();
    assert_eq!(status.state, SupervisorState::Running);
    assert_eq!(status.pid, Some(handle.pid));
    assert!(
        status
            .liveness
            .as_ref()
            .is_some_and(Liveness::is_recognized_server),
        "unexpected liveness: {:?}",
        status.liveness
    );
    assert!(!status.is_stale());

    let outcome = supervisor(&ws.state_file).stop().await.unwrap();
    assert_eq!(outcome, StopOutcome::Signaled(handle.pid));
    assert!(!ws.state_file.exists());

    assert!(
        wait_until_gone(&DetachedLauncher::new(), handle.pid).await,
        "server should exit after SIGTERM"
    );
}

#[tokio::test]
async fn test_second_start_is_refused_while_running() {
    let ws = workspace();

    let handle = supervisor(&ws.state_file)
        .start(&launch_config(&ws))
        .await
        .unwrap();

    let second = supervisor(&ws.state_file)
        .with_occupancy_policy(OccupancyPolicy::VerifyLiveness)
        .start(&launch_config(&ws))
        .await;
    assert!(second.is_err());
    assert_eq!(
        fs::read_to_string(&ws.state_file).unwrap(),
        handle.pid.to_string()
    );

    supervisor(&ws.state_file).stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_after_process_exited() {
    let ws = workspace();

    // Reaped child: its pid no longer names a process
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let dead_pid = child.id();
    child.wait().unwrap();
    fs::write(&ws.state_file, dead_pid.to_string()).unwrap();

    let status = supervisor(&ws.state_file).status().unwrap();
    assert!(status.is_stale());

    let outcome = supervisor(&ws.state_file).stop().await.unwrap();
    assert!(matches!(outcome, StopOutcome::AlreadyExited(pid) if pid.as_u32() == dead_pid));
    assert!(!ws.state_file.exists());
}

#[tokio::test]
async fn test_liveness_policy_reclaims_dead_pid() {
    let ws = workspace();

    let mut child = std::process::Command::new("true").spawn().unwrap();
    let dead_pid = child.id();
    child.wait().unwrap();
    fs::write(&ws.state_file, dead_pid.to_string()).unwrap();

    let handle = supervisor(&ws.state_file)
        .with_occupancy_policy(OccupancyPolicy::VerifyLiveness)
        .start(&launch_config(&ws))
        .await
        .unwrap();

    assert_ne!(handle.pid.as_u32(), dead_pid);
    assert_eq!(
        fs::read_to_string(&ws.state_file).unwrap(),
        handle.pid.to_string()
    );

    supervisor(&ws.state_file).stop().await.unwrap();
}
