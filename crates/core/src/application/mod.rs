// Application Layer - Use Cases

pub mod artifact;
pub mod supervisor;

// Re-exports
pub use artifact::ArtifactService;
pub use supervisor::{ProcessSupervisor, StopOutcome, SupervisorStatus};
