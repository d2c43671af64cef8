// Port Layer - Capability interfaces for external dependencies

pub mod fetcher;
pub mod process_launcher;
pub mod process_registry;

// Re-exports
pub use fetcher::{FetchError, Fetcher, UnavailableFetcher};
pub use process_launcher::{LaunchError, ProcessLauncher, TerminateOutcome};
pub use process_registry::{ProcessRegistry, RegistryError};
