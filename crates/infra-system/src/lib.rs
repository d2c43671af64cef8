// modelhost Infrastructure - System Adapters
// Implements: ProcessRegistry, ProcessLauncher, Fetcher

pub mod detached_launcher;
pub mod file_registry;
#[cfg(feature = "hf-hub")]
pub mod hub_fetcher;
pub mod modelscope_fetcher;

pub use detached_launcher::DetachedLauncher;
pub use file_registry::FileProcessRegistry;
#[cfg(feature = "hf-hub")]
pub use hub_fetcher::HubFetcher;
pub use modelscope_fetcher::ModelScopeCliFetcher;

use modelhost_core::port::Fetcher;
use std::sync::Arc;

/// Hugging Face fetcher, or a placeholder reporting how to get one
pub fn hub_fetcher() -> Arc<dyn Fetcher> {
    #[cfg(feature = "hf-hub")]
    {
        Arc::new(HubFetcher::new())
    }

    #[cfg(not(feature = "hf-hub"))]
    {
        Arc::new(modelhost_core::port::UnavailableFetcher::new(
            "huggingface",
            "this build has no Hugging Face support; rebuild with: cargo build --features hf-hub",
        ))
    }
}
