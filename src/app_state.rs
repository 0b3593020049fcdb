//! Composition root shared by the diagnostics handlers and feature modules.

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::emitter::EventEmitter;
use crate::error::BridgeError;
use crate::executor::ExecutorRegistry;
use crate::service::TaskService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Process-wide event emitter.
    pub emitter: EventEmitter,
    /// Registry of every executor pool.
    pub executors: Arc<ExecutorRegistry>,
}

impl AppState {
    /// Bundles an already constructed emitter and registry.
    #[must_use]
    pub fn new(emitter: EventEmitter, executors: Arc<ExecutorRegistry>) -> Self {
        Self { emitter, executors }
    }

    /// Starts the emitter and builds the registry from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ThreadSpawn`] if the coordinator thread cannot
    /// be started.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let emitter = EventEmitter::spawn(config.queue_capacity())?;
        let executors = Arc::new(ExecutorRegistry::new(Arc::new(config.executors.clone())));
        Ok(Self::new(emitter, executors))
    }

    /// Executor facade for the named feature module.
    #[must_use]
    pub fn task_service(&self, service: &str) -> TaskService {
        TaskService::new(service, Arc::clone(&self.executors))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};

    use super::*;
    use crate::config::EnvPoolConfig;

    #[tokio::test]
    async fn from_config_wires_emitter_and_registry() {
        let config = BridgeConfig {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            event_queue_capacity: 16,
            executors: EnvPoolConfig::from_vars([("TASK_EXECUTOR_MAX_POOL_SIZE", "4")]),
        };
        let Ok(state) = AppState::from_config(&config) else {
            panic!("state should build");
        };

        let pool = state.task_service("Storage").executor();
        assert_eq!(pool.name().as_str(), "StorageExecutor");
        assert_eq!(state.executors.len(), 2);

        let Ok(snapshot) = state.emitter.sync().await else {
            panic!("coordinator should be running");
        };
        assert_eq!(snapshot.listeners, 0);
        state.task_service("Storage").shutdown();
    }
}
