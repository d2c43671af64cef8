//! modelhost CLI - fetch a model once and supervise its vLLM server
//!
//! Every invocation is short-lived: it reads the state file, acts, and exits.

mod logging;
mod output;
mod settings;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use modelhost_core::application::{ArtifactService, ProcessSupervisor};
use modelhost_core::domain::defaults::{
    DEFAULT_COMPLETION_MARKER, DEFAULT_INTERPRETER, DEFAULT_MODEL_ID, DEFAULT_PORT,
    DEFAULT_SERVED_MODEL_NAME, DEFAULT_TENSOR_PARALLEL_SIZE, ENV_INTERPRETER, ENV_LOG_FORMAT,
    ENV_PORT, ENV_ROOT, ENV_TENSOR_PARALLEL_SIZE,
};
use modelhost_core::domain::{ArtifactRecord, OccupancyPolicy, ServerLaunchConfig};
use modelhost_core::port::Fetcher;
use modelhost_infra_system::{DetachedLauncher, FileProcessRegistry, ModelScopeCliFetcher};

use logging::LogFormat;
use settings::ToolPaths;

#[derive(Parser)]
#[command(name = "modelhost")]
#[command(about = "Fetch a model and manage its vLLM server (start/stop)", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Tool root holding the state file, server log and models/
    #[arg(long, global = true, env = ENV_ROOT, default_value = ".")]
    root: String,

    /// Diagnostic log format
    #[arg(long, global = true, env = ENV_LOG_FORMAT, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the vLLM server in the background
    Start(StartArgs),

    /// Stop the vLLM server recorded in the state file
    Stop,

    /// Download the model unless it is already present
    Fetch(FetchArgs),

    /// Show what the state file says and whether that process is alive
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct StartArgs {
    /// Listening port
    #[arg(long, env = ENV_PORT, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Tensor parallel size
    #[arg(long, env = ENV_TENSOR_PARALLEL_SIZE, default_value_t = DEFAULT_TENSOR_PARALLEL_SIZE)]
    tensor_parallel_size: u32,

    /// Model directory (default: <root>/models/Qwen3-8B/Qwen/Qwen3-8B)
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Public model name announced by the server
    #[arg(long, default_value = DEFAULT_SERVED_MODEL_NAME)]
    served_model_name: String,

    /// Python interpreter with vLLM installed
    #[arg(long, env = ENV_INTERPRETER, default_value = DEFAULT_INTERPRETER)]
    python: String,

    /// Reclaim the state file if its process is gone or is not a vLLM server
    #[arg(long)]
    check_liveness: bool,

    /// Server stdout/stderr destination (default: <root>/vllm_server.log)
    #[arg(long, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Let the server write to this terminal instead of a log file
    #[arg(long)]
    no_log_file: bool,

    /// Extra arguments passed to the server verbatim (after `--`)
    #[arg(last = true)]
    extra: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FetchSource {
    Modelscope,
    Huggingface,
}

#[derive(Args)]
struct FetchArgs {
    /// Repository id of the model
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    model_id: String,

    /// Revision (branch, tag or commit)
    #[arg(long)]
    revision: Option<String>,

    /// Download directory (default: <root>/models/Qwen3-8B)
    #[arg(long)]
    target_dir: Option<PathBuf>,

    /// Where to download from
    #[arg(long, value_enum, default_value_t = FetchSource::Modelscope)]
    source: FetchSource,

    /// File whose presence means the download already completed
    #[arg(long, default_value = DEFAULT_COMPLETION_MARKER)]
    marker: String,

    /// ModelScope executable
    #[arg(long, env = "MODELSCOPE_BIN", default_value = "modelscope")]
    modelscope_bin: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format)?;

    let paths = ToolPaths::new(&cli.root);
    tracing::debug!(root = %paths.root().display(), "Resolved tool root");

    match cli.command {
        Commands::Start(args) => start(&paths, args).await,
        Commands::Stop => stop(&paths).await,
        Commands::Fetch(args) => fetch(&paths, args).await,
        Commands::Status { json } => status(&paths, json),
    }
}

fn supervisor(paths: &ToolPaths) -> ProcessSupervisor {
    ProcessSupervisor::new(
        Arc::new(FileProcessRegistry::new(paths.state_file())),
        Arc::new(DetachedLauncher::new()),
    )
}

fn launch_config(paths: &ToolPaths, args: StartArgs) -> ServerLaunchConfig {
    let model_path = args
        .model_path
        .unwrap_or_else(|| paths.default_model_path());

    let config = ServerLaunchConfig::new(model_path)
        .with_port(args.port)
        .with_tensor_parallel_size(args.tensor_parallel_size)
        .with_served_model_name(args.served_model_name)
        .with_interpreter(args.python)
        .with_extra_args(args.extra);

    if args.no_log_file {
        config
    } else {
        config.with_log_file(args.log_file.unwrap_or_else(|| paths.server_log()))
    }
}

async fn start(paths: &ToolPaths, args: StartArgs) -> Result<()> {
    let occupancy = if args.check_liveness {
        OccupancyPolicy::VerifyLiveness
    } else {
        OccupancyPolicy::FileExists
    };
    let config = launch_config(paths, args);

    let handle = supervisor(paths)
        .with_occupancy_policy(occupancy)
        .start(&config)
        .await
        .context("Failed to start vLLM server")?;

    output::print_launch_plan(&handle.command);
    output::print_started(&handle);
    Ok(())
}

async fn stop(paths: &ToolPaths) -> Result<()> {
    let outcome = supervisor(paths)
        .stop()
        .await
        .context("Failed to stop vLLM server")?;

    output::print_stop(&outcome);
    Ok(())
}

async fn fetch(paths: &ToolPaths, args: FetchArgs) -> Result<()> {
    let target_dir = args.target_dir.unwrap_or_else(|| paths.artifact_dir());
    let mut record = ArtifactRecord::new(args.model_id, target_dir)
        .context("Invalid model id")?
        .with_marker(args.marker);
    if let Some(revision) = args.revision {
        record = record.with_revision(revision);
    }

    let fetcher: Arc<dyn Fetcher> = match args.source {
        FetchSource::Modelscope => Arc::new(ModelScopeCliFetcher::with_program(args.modelscope_bin)),
        FetchSource::Huggingface => modelhost_infra_system::hub_fetcher(),
    };

    println!(
        "Fetching {} into {} (source: {})",
        record.id,
        record.target_dir.display(),
        fetcher.name()
    );

    let local = ArtifactService::new(fetcher)
        .ensure_local(&record)
        .await
        .context("Failed to fetch model")?;

    output::print_fetched(&local);
    Ok(())
}

fn status(paths: &ToolPaths, json: bool) -> Result<()> {
    let status = supervisor(paths)
        .status()
        .context("Failed to read supervisor state")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        output::print_status(&status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_start_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "modelhost",
            "start",
            "--port",
            "9000",
            "--tensor-parallel-size",
            "4",
            "--model-path",
            "/models/custom",
            "--",
            "--max-model-len",
            "8192",
        ])
        .unwrap();

        let Commands::Start(args) = cli.command else {
            panic!("expected start");
        };
        let config = launch_config(&ToolPaths::new("/srv/rca"), args);

        assert_eq!(config.port, 9000);
        assert_eq!(config.tensor_parallel_size, 4);
        assert_eq!(config.model_path, PathBuf::from("/models/custom"));
        assert_eq!(config.extra_args, vec!["--max-model-len", "8192"]);
        assert_eq!(
            config.log_file,
            Some(PathBuf::from("/srv/rca/vllm_server.log"))
        );
    }

    #[test]
    fn test_start_defaults_follow_root_layout() {
        let cli = Cli::try_parse_from(["modelhost", "--root", "/srv/rca", "start", "--no-log-file"])
            .unwrap();

        let Commands::Start(args) = cli.command else {
            panic!("expected start");
        };
        let config = launch_config(&ToolPaths::new(&cli.root), args);

        assert_eq!(
            config.model_path,
            PathBuf::from("/srv/rca/models/Qwen3-8B/Qwen/Qwen3-8B")
        );
        assert_eq!(config.served_model_name, DEFAULT_SERVED_MODEL_NAME);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_stop_takes_no_arguments() {
        assert!(Cli::try_parse_from(["modelhost", "stop"]).is_ok());
        assert!(Cli::try_parse_from(["modelhost", "stop", "--port", "1"]).is_err());
    }

    #[test]
    fn test_fetch_source_parsing() {
        let cli = Cli::try_parse_from(["modelhost", "fetch", "--source", "huggingface"]).unwrap();
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.source, FetchSource::Huggingface);
        assert_eq!(args.model_id, DEFAULT_MODEL_ID);
    }

    /// Env var fallbacks; kept in one test since the environment is process-global
    #[test]
    fn test_start_env_fallbacks_and_flag_precedence() {
        std::env::set_var(ENV_PORT, "9100");
        std::env::set_var(ENV_TENSOR_PARALLEL_SIZE, "2");

        let from_env = Cli::try_parse_from(["modelhost", "start"]);
        let overridden = Cli::try_parse_from(["modelhost", "start", "--port", "9200"]);

        std::env::remove_var(ENV_PORT);
        std::env::remove_var(ENV_TENSOR_PARALLEL_SIZE);

        let Commands::Start(args) = from_env.unwrap().command else {
            panic!("expected start");
        };
        let config = launch_config(&ToolPaths::new("/srv/rca"), args);
        assert_eq!(config.port, 9100);
        assert_eq!(config.tensor_parallel_size, 2);

        let Commands::Start(args) = overridden.unwrap().command else {
            panic!("expected start");
        };
        let config = launch_config(&ToolPaths::new("/srv/rca"), args);
        assert_eq!(config.port, 9200);
        assert_eq!(config.tensor_parallel_size, 2);

        let Commands::Start(args) = Cli::try_parse_from(["modelhost", "start"]).unwrap().command
        else {
            panic!("expected start");
        };
        let config = launch_config(&ToolPaths::new("/srv/rca"), args);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.tensor_parallel_size, DEFAULT_TENSOR_PARALLEL_SIZE);
    }
}
