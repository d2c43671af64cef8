// Defaults (ADR: No magic values)

/// Artifact identifier fetched when none is given
pub const DEFAULT_MODEL_ID: &str = "Qwen/Qwen3-8B";

/// Public model name announced by the server
pub const DEFAULT_SERVED_MODEL_NAME: &str = "Qwen/Qwen3-8B";

/// Directory (relative to the tool root) that receives the artifact
pub const DEFAULT_ARTIFACT_DIR: &str = "models/Qwen3-8B";

/// File the fetched artifact must contain
pub const DEFAULT_COMPLETION_MARKER: &str = "config.json";

/// Written next to the marker once a fetch returned successfully.
/// Only a directory holding both counts as a completed fetch.
pub const COMPLETION_SENTINEL: &str = ".modelhost-complete";

/// How deep below the target directory the marker is searched for.
/// Covers `<org>/<name>` and `models--org--name/snapshots/<sha>` layouts.
pub const MARKER_SEARCH_DEPTH: usize = 4;

/// State file name (relative to the tool root)
pub const STATE_FILE_NAME: &str = "vllm_server.pid";

/// Server log file name (relative to the tool root)
pub const SERVER_LOG_FILE_NAME: &str = "vllm_server.log";

pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_TENSOR_PARALLEL_SIZE: u32 = 1;

pub const DEFAULT_INTERPRETER: &str = "python3";

/// Module run with `<interpreter> -m`
pub const SERVER_ENTRYPOINT: &str = "vllm.entrypoints.openai.api_server";

// Environment variables consulted when the matching flag is omitted
pub const ENV_PORT: &str = "VLLM_PORT";
pub const ENV_TENSOR_PARALLEL_SIZE: &str = "VLLM_TP";
pub const ENV_INTERPRETER: &str = "VLLM_PYTHON";
pub const ENV_ROOT: &str = "MODELHOST_ROOT";
pub const ENV_LOG_FORMAT: &str = "MODELHOST_LOG_FORMAT";
