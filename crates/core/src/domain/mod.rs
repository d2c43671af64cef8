// Domain Layer - Pure value objects and policies

pub mod artifact;
pub mod defaults;
pub mod error;
pub mod launch;
pub mod process;

// Re-exports
pub use artifact::ArtifactRecord;
pub use error::DomainError;
pub use launch::{LaunchCommand, ServerLaunchConfig};
pub use process::{
    Liveness, OccupancyPolicy, ProcessHandle, ProcessId, SupervisionPolicy, SupervisorState,
};
