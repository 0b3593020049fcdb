//! Task service: a feature module's view of the executor registry.

use std::sync::Arc;

use crate::executor::{ExecutorName, ExecutorRegistry, Pool};

/// Executor access scoped to one service.
///
/// Cheap to clone; every clone shares the same registry, so two services
/// constructed with the same name share pools.
#[derive(Debug, Clone)]
pub struct TaskService {
    service: String,
    registry: Arc<ExecutorRegistry>,
}

impl TaskService {
    /// Creates a facade for `service` over the shared registry.
    #[must_use]
    pub fn new(service: impl Into<String>, registry: Arc<ExecutorRegistry>) -> Self {
        Self {
            service: service.into(),
            registry,
        }
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the service's default pool.
    pub fn executor(&self) -> Arc<Pool> {
        self.registry.get_executor(&self.service)
    }

    /// Returns the service's transactional pool for `identifier`.
    ///
    /// An empty identifier selects the shared transactional pool.
    pub fn transactional_executor(&self, identifier: &str) -> Arc<Pool> {
        let identifier = (!identifier.is_empty()).then_some(identifier);
        self.registry
            .get_transactional_executor(&self.service, identifier)
    }

    /// Shuts down and unregisters the transactional pool for `identifier`.
    ///
    /// Returns `false` if it was never created or already removed.
    pub fn remove_transactional_executor(&self, identifier: &str) -> bool {
        self.registry
            .remove_executor(&ExecutorName::transactional(&self.service, identifier))
    }

    /// Shuts down every pool belonging to this service.
    pub fn shutdown(&self) -> usize {
        self.registry.shutdown_all(&self.service)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::config::{PoolConfig, StaticPoolConfig};
    use crate::error::TaskError;
    use crate::executor::PoolKind;

    fn registry() -> Arc<ExecutorRegistry> {
        let provider = StaticPoolConfig::new().with_service(
            "Firestore",
            PoolConfig {
                max_pool_size: 3,
                keep_alive_secs: 1,
            },
        );
        Arc::new(ExecutorRegistry::new(Arc::new(provider)))
    }

    #[tokio::test]
    async fn executor_runs_work_for_the_service() {
        let tasks = TaskService::new("Firestore", registry());
        let pool = tasks.executor();
        assert_eq!(pool.name().as_str(), "FirestoreExecutor");

        let handle = pool.call(|| 6 * 7);
        let Ok(answer) = handle.await else {
            panic!("task should complete");
        };
        assert_eq!(answer, 42);
        tasks.shutdown();
    }

    #[test]
    fn empty_identifier_selects_shared_transactional_pool() {
        let registry = registry();
        let tasks = TaskService::new("Firestore", Arc::clone(&registry));
        let shared = tasks.transactional_executor("");
        assert_eq!(shared.kind(), PoolKind::Transactional);
        assert!(Arc::ptr_eq(
            &shared,
            &registry.get_transactional_executor("Firestore", None)
        ));
        assert!(!Arc::ptr_eq(&shared, &tasks.transactional_executor("tx-1")));
    }

    #[tokio::test]
    async fn removed_transactional_executor_cancels_and_recreates() {
        let tasks = TaskService::new("Firestore", registry());
        let pool = tasks.transactional_executor("tx-1");
        assert!(tasks.remove_transactional_executor("tx-1"));
        assert!(!tasks.remove_transactional_executor("tx-1"));

        let Err(err) = pool.call(|| ()).await else {
            panic!("shut down pool must not run work");
        };
        assert!(matches!(err, TaskError::Rejected(_)));

        let fresh = tasks.transactional_executor("tx-1");
        assert!(!Arc::ptr_eq(&pool, &fresh));
        tasks.shutdown();
    }

    #[test]
    fn services_do_not_tear_down_each_other() {
        let registry = registry();
        let firestore = TaskService::new("Firestore", Arc::clone(&registry));
        let storage = TaskService::new("Storage", Arc::clone(&registry));
        let kept = storage.executor();
        let _ = firestore.executor();

        assert_eq!(firestore.shutdown(), 2);
        assert!(!kept.is_shutdown());
        assert_eq!(registry.len(), 1);
        assert_eq!(storage.service(), "Storage");
    }
}
