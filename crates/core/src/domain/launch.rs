// Server launch configuration and argument vector construction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::defaults::{
    DEFAULT_INTERPRETER, DEFAULT_PORT, DEFAULT_SERVED_MODEL_NAME, DEFAULT_TENSOR_PARALLEL_SIZE,
    SERVER_ENTRYPOINT,
};
use super::error::{DomainError, Result};

/// Everything needed to launch one server process. Built per invocation, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLaunchConfig {
    pub model_path: PathBuf,
    pub port: u16,
    pub served_model_name: String,
    pub tensor_parallel_size: u32,
    pub interpreter: String,
    /// Appended verbatim after the managed flags
    pub extra_args: Vec<String>,
    /// Server stdout/stderr destination; inherited when `None`
    pub log_file: Option<PathBuf>,
}

impl ServerLaunchConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            port: DEFAULT_PORT,
            served_model_name: DEFAULT_SERVED_MODEL_NAME.to_string(),
            tensor_parallel_size: DEFAULT_TENSOR_PARALLEL_SIZE,
            interpreter: DEFAULT_INTERPRETER.to_string(),
            extra_args: Vec::new(),
            log_file: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_tensor_parallel_size(mut self, size: u32) -> Self {
        self.tensor_parallel_size = size;
        self
    }

    pub fn with_served_model_name(mut self, name: impl Into<String>) -> Self {
        self.served_model_name = name.into();
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Reject values the server would refuse anyway
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(DomainError::ValidationError(
                "port must be between 1 and 65535".to_string(),
            ));
        }

        if self.tensor_parallel_size == 0 {
            return Err(DomainError::ValidationError(
                "tensor parallel size must be at least 1".to_string(),
            ));
        }

        if self.served_model_name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "served model name cannot be empty".to_string(),
            ));
        }

        if self.interpreter.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "interpreter cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the flat argument vector for the server process
    pub fn to_command(&self) -> LaunchCommand {
        let mut args = vec![
            "-m".to_string(),
            SERVER_ENTRYPOINT.to_string(),
            "--model".to_string(),
            self.model_path.display().to_string(),
            "--port".to_string(),
            self.port.to_string(),
            "--served-model-name".to_string(),
            self.served_model_name.clone(),
            "--tensor-parallel-size".to_string(),
            self.tensor_parallel_size.to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());

        LaunchCommand {
            program: self.interpreter.clone(),
            args,
            log_file: self.log_file.clone(),
        }
    }
}

/// Program + arguments handed to a `ProcessLauncher`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub log_file: Option<PathBuf>,
}

impl LaunchCommand {
    /// Full argv including the program
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Value following `flag`, if present
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|idx| self.args.get(idx + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_command_contains_all_flags() {
        let config = ServerLaunchConfig::new("/models/Qwen3-8B")
            .with_port(9000)
            .with_tensor_parallel_size(2)
            .with_interpreter("/opt/venv/bin/python");

        let cmd = config.to_command();

        assert_eq!(cmd.program, "/opt/venv/bin/python");
        assert_eq!(&cmd.args[..2], &["-m", SERVER_ENTRYPOINT]);
        assert_eq!(cmd.flag_value("--model"), Some("/models/Qwen3-8B"));
        assert_eq!(cmd.flag_value("--port"), Some("9000"));
        assert_eq!(cmd.flag_value("--served-model-name"), Some("Qwen/Qwen3-8B"));
        assert_eq!(cmd.flag_value("--tensor-parallel-size"), Some("2"));
    }

    #[test]
    fn test_extra_args_come_last() {
        let cmd = ServerLaunchConfig::new("/m")
            .with_extra_args(vec!["--max-model-len".to_string(), "8192".to_string()])
            .to_command();

        let argv = cmd.argv();
        assert_eq!(argv[argv.len() - 2..], ["--max-model-len", "8192"]);
    }

    #[test]
    fn test_validate() {
        assert!(ServerLaunchConfig::new("/m").validate().is_ok());
        assert!(ServerLaunchConfig::new("/m").with_port(0).validate().is_err());
        assert!(ServerLaunchConfig::new("/m")
            .with_tensor_parallel_size(0)
            .validate()
            .is_err());
        assert!(ServerLaunchConfig::new("/m")
            .with_served_model_name("")
            .validate()
            .is_err());
    }

    #[test]
    fn test_display_joins_argv() {
        let cmd = LaunchCommand {
            program: "python3".to_string(),
            args: vec!["-m".to_string(), "x".to_string()],
            log_file: None,
        };
        assert_eq!(cmd.to_string(), "python3 -m x");
    }
}
