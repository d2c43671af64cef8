//! Human-facing command output

use colored::Colorize;
use tabled::{Table, Tabled};

use modelhost_core::application::{StopOutcome, SupervisorStatus};
use modelhost_core::domain::{LaunchCommand, Liveness, ProcessHandle};

/// Echo the command the server was actually started with
pub fn print_launch_plan(command: &LaunchCommand) {
    let flag = |name: &str| command.flag_value(name).unwrap_or("-").to_string();

    println!("{}", "vLLM launch configuration:".cyan().bold());
    println!("  {} {}", "Command:".bold(), command);
    println!("  {} {}", "Model path:".bold(), flag("--model"));
    println!("  {} {}", "Port:".bold(), flag("--port"));
    println!("  {} {}", "Served model name:".bold(), flag("--served-model-name"));
    println!(
        "  {} {}",
        "Tensor parallel size:".bold(),
        flag("--tensor-parallel-size")
    );
    if let Some(log_file) = &command.log_file {
        println!("  {} {}", "Server log:".bold(), log_file.display());
    }
}

pub fn print_started(handle: &ProcessHandle) {
    println!();
    println!(
        "{}",
        format!("✓ vLLM started in background, PID={}", handle.pid)
            .green()
            .bold()
    );
    println!("  PID written to {}", handle.state_file.display());
}

pub fn print_stop(outcome: &StopOutcome) {
    match outcome {
        StopOutcome::NotRunning => {
            println!(
                "{}",
                "⚠ No state file found, the server is probably not running".yellow()
            );
        }
        StopOutcome::Signaled(pid) => {
            println!("{}", format!("✓ SIGTERM sent to PID {pid}").green().bold());
        }
        StopOutcome::AlreadyExited(pid) => {
            println!(
                "{}",
                format!("○ Process {pid} does not exist, it has probably already exited").yellow()
            );
        }
        StopOutcome::CorruptState { content } => {
            println!(
                "{}",
                format!("⚠ State file content is invalid: {content:?}").yellow()
            );
        }
        StopOutcome::SignalFailed { pid, reason } => {
            println!(
                "{}",
                format!("✗ Could not signal PID {pid}: {reason}").red()
            );
        }
        StopOutcome::Unreadable { reason } => {
            println!("{}", format!("✗ State file unreadable: {reason}").red());
        }
    }

    if *outcome != StopOutcome::NotRunning {
        println!("  State file removed.");
    }
}

pub fn print_fetched(path: &std::path::Path) {
    println!(
        "{}",
        format!("✓ Model available at {}", path.display())
            .green()
            .bold()
    );
}

#[derive(Tabled)]
struct StatusRow {
    field: &'static str,
    value: String,
}

fn describe_liveness(liveness: &Liveness) -> String {
    match liveness {
        Liveness::Running { .. } if liveness.is_recognized_server() => "running (vLLM)".to_string(),
        Liveness::Running { command } => format!("running, foreign: {}", command.join(" ")),
        Liveness::Zombie => "exited (zombie)".to_string(),
        Liveness::Gone => "gone".to_string(),
        Liveness::Unknown => "unknown".to_string(),
    }
}

pub fn print_status(status: &SupervisorStatus) {
    println!("{}", "Server Status".cyan().bold());
    println!();

    let mut rows = vec![
        StatusRow {
            field: "State",
            value: status.state.to_string(),
        },
        StatusRow {
            field: "State file",
            value: status.state_file.display().to_string(),
        },
    ];

    if let Some(pid) = status.pid {
        rows.push(StatusRow {
            field: "PID",
            value: pid.to_string(),
        });
    }
    if let Some(liveness) = &status.liveness {
        rows.push(StatusRow {
            field: "Process",
            value: describe_liveness(liveness),
        });
    }
    if let Some(content) = &status.corrupt_content {
        rows.push(StatusRow {
            field: "Invalid content",
            value: format!("{content:?}"),
        });
    }
    if let Some(recorded_at) = status.recorded_at {
        rows.push(StatusRow {
            field: "Recorded at",
            value: recorded_at.to_rfc3339(),
        });
    }

    println!("{}", Table::new(rows));

    if status.is_stale() {
        println!();
        println!(
            "{}",
            "⚠ State file looks stale; run `modelhost stop` or `modelhost start --check-liveness`"
                .yellow()
        );
    }
}
