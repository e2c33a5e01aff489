//! The unified soul facade.
//!
//! [`Soul`] wires the completion client, the registry and the shared
//! configuration into both orchestrators and exposes the operations the
//! command line needs.

use soul_completion::{AnthropicClient, CompletionService};
use soul_registry::SoulRegistry;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::{ConfigPatch, SharedConfig, SoulConfig};
use crate::engine::Orchestrator;
use crate::pipeline::Collaborators;
use crate::result::RequestResult;
use crate::stream::{SoulEventStream, StreamingOrchestrator};
use crate::Result;

/// Entry point for asking the soul.
///
/// # Example
///
/// ```rust,ignore
/// let soul = Soul::open(SoulConfig::load("soul.toml")?, "./soul.db")?;
///
/// let result = soul.ask("I lost my job today").await?;
/// println!("{}", result.response());
/// ```
pub struct Soul {
    registry: Arc<SoulRegistry>,
    config: SharedConfig,
    orchestrator: Orchestrator,
    streaming: StreamingOrchestrator,
}

impl Soul {
    /// Builds a soul from explicit collaborators.
    pub fn new(
        config: SoulConfig,
        registry: Arc<SoulRegistry>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        let config = SharedConfig::new(config);
        let collaborators = Collaborators::with_registry(completion, registry.clone());

        Self {
            orchestrator: Orchestrator::new(collaborators.clone(), config.clone()),
            streaming: StreamingOrchestrator::new(collaborators, config.clone()),
            registry,
            config,
        }
    }

    /// Opens the registry at `db_path`, seeds default habits into an empty
    /// registry, and connects the Anthropic client.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be opened or seeded, or the
    /// HTTP client cannot be built.
    pub fn open(config: SoulConfig, db_path: impl AsRef<Path>) -> Result<Self> {
        let registry = Arc::new(SoulRegistry::open(db_path.as_ref())?);
        let seeded = registry.seed_if_empty(false)?;
        let completion = Arc::new(AnthropicClient::new(config.anthropic_settings())?);

        info!(
            db = %db_path.as_ref().display(),
            seeded,
            habits = registry.habit_count(),
            "soul opened"
        );
        Ok(Self::new(config, registry, completion))
    }

    /// Processes `message` and returns the complete result.
    pub async fn ask(&self, message: &str) -> Result<RequestResult> {
        self.orchestrator.process(message).await
    }

    /// Processes `message`, reporting progress as events.
    pub fn stream(&self, message: impl Into<String>) -> SoulEventStream {
        self.streaming.stream(message)
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> Arc<SoulConfig> {
        self.config.snapshot()
    }

    /// Applies `patch` for subsequent requests.
    pub fn update_config(&self, patch: &ConfigPatch) -> Result<Arc<SoulConfig>> {
        self.config.update(patch)
    }

    pub fn registry(&self) -> &Arc<SoulRegistry> {
        &self.registry
    }
}

impl std::fmt::Debug for Soul {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Soul")
            .field("config", &self.config.snapshot())
            .finish_non_exhaustive()
    }
}
