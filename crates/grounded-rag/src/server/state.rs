//! Application state for the HTTP adapter

use std::sync::Arc;

use crate::agent::Agent;
use crate::config::RagConfig;
use crate::error::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Agent over the index loaded at startup
    agent: Arc<Agent>,
}

impl AppState {
    /// Load the index and connect the providers
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state...");
        let agent = Arc::new(Agent::from_config(&config)?);
        tracing::info!(
            "Agent ready: {} vectors, top-k {}",
            agent.index().len(),
            config.index.top_k
        );
        Ok(Self::from_agent(config, agent))
    }

    /// Wrap an existing agent
    pub fn from_agent(config: RagConfig, agent: Arc<Agent>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, agent }),
        }
    }

    /// Configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Shared agent
    pub fn agent(&self) -> &Arc<Agent> {
        &self.inner.agent
    }

    /// Ready once an index holding at least one vector is loaded
    pub fn is_ready(&self) -> bool {
        !self.inner.agent.index().is_empty()
    }
}
