//! Named pool storage with lookup-or-create semantics.
//!
//! [`ExecutorRegistry`] hands every service its own concurrency domain.
//! Pools are created lazily on first request and live until removed by
//! name or torn down with their service.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{ExecutorName, Fallback, Pool, PoolStats};
use crate::config::{PoolConfig, PoolConfigProvider};
use crate::error::BridgeError;

#[derive(Debug, Default)]
struct RegistryState {
    pools: HashMap<ExecutorName, Arc<Pool>>,
    /// Settings resolved when a service's default pool is first created.
    /// Cleared by [`ExecutorRegistry::shutdown_all`].
    services: HashMap<String, PoolConfig>,
}

/// Central store for every live executor pool.
///
/// One coarse lock guards the name → pool map. It is held only for lookup
/// and insert; creating a pool starts no threads, and shutting one down
/// happens after it has been unregistered.
///
/// Bounded pools look their transactional fallback up through the registry
/// on every rejection, creating it if it was removed.
#[derive(Debug)]
pub struct ExecutorRegistry {
    config: Arc<dyn PoolConfigProvider>,
    state: Arc<Mutex<RegistryState>>,
}

impl ExecutorRegistry {
    /// Creates an empty registry reading pool settings from `config`.
    #[must_use]
    pub fn new(config: Arc<dyn PoolConfigProvider>) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(RegistryState::default())),
        }
    }

    /// Returns the service's default pool, creating it on first use.
    ///
    /// Services configured with `max_pool_size <= 1` get their
    /// transactional pool; others get a bounded pool that falls back to it.
    pub fn get_executor(&self, service: &str) -> Arc<Pool> {
        let config = self.service_config(service);
        let mut state = self.state.lock();
        if config.is_transactional() {
            return transactional_locked(&mut state, service, "");
        }

        let name = ExecutorName::bounded(service);
        if let Some(pool) = state.pools.get(&name) {
            return Arc::clone(pool);
        }
        let _ = transactional_locked(&mut state, service, "");
        let pool = Pool::bounded(
            name.clone(),
            config.max_pool_size,
            config.keep_alive(),
            Some(self.fallback_for(service)),
        );
        tracing::info!(
            executor = %name,
            max_pool_size = config.max_pool_size,
            keep_alive_secs = config.keep_alive_secs,
            "executor created"
        );
        state.pools.insert(name, Arc::clone(&pool));
        pool
    }

    /// Returns a single-worker pool for the service, optionally namespaced
    /// by `identifier` so independent sessions do not serialize against
    /// each other.
    pub fn get_transactional_executor(&self, service: &str, identifier: Option<&str>) -> Arc<Pool> {
        let mut state = self.state.lock();
        transactional_locked(&mut state, service, identifier.unwrap_or_default())
    }

    /// Looks up a pool by its registry name.
    #[must_use]
    pub fn get(&self, name: &ExecutorName) -> Option<Arc<Pool>> {
        self.state.lock().pools.get(name).cloned()
    }

    /// Shuts down and unregisters the named pool.
    ///
    /// Returns `false` if no such pool was registered.
    pub fn remove_executor(&self, name: &ExecutorName) -> bool {
        let removed = self.state.lock().pools.remove(name);
        match removed {
            Some(pool) => {
                pool.shutdown_now();
                tracing::info!(executor = %name, "executor removed");
                true
            }
            None => false,
        }
    }

    /// Shuts down and unregisters every pool of `service`. Returns how many
    /// were removed.
    ///
    /// The service's settings are read again when it next gets a pool.
    pub fn shutdown_all(&self, service: &str) -> usize {
        let removed: Vec<Arc<Pool>> = {
            let mut state = self.state.lock();
            state.services.remove(service);
            let names: Vec<ExecutorName> = state
                .pools
                .keys()
                .filter(|name| name.belongs_to(service))
                .cloned()
                .collect();
            names
                .iter()
                .filter_map(|name| state.pools.remove(name))
                .collect()
        };
        for pool in &removed {
            pool.shutdown_now();
        }
        tracing::info!(service, removed = removed.len(), "service executors shut down");
        removed.len()
    }

    /// Counters for every registered pool, ordered by name.
    #[must_use]
    pub fn stats(&self) -> Vec<PoolStats> {
        let pools: Vec<Arc<Pool>> = self.state.lock().pools.values().cloned().collect();
        let mut stats: Vec<PoolStats> = pools.iter().map(|p| p.stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Number of registered pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().pools.len()
    }

    /// Returns `true` if no pool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().pools.is_empty()
    }

    /// Transactional fallback of `service`, resolved on each rejection.
    ///
    /// Only a pool still registered under its name may reroute, so a removed
    /// bounded pool cannot recreate its service's pools.
    fn fallback_for(&self, service: &str) -> Fallback {
        let state: Weak<Mutex<RegistryState>> = Arc::downgrade(&self.state);
        let service = service.to_string();
        Fallback::resolve_with(move |rejecting| {
            let state = state.upgrade()?;
            let mut state = state.lock();
            let registered = state
                .pools
                .get(rejecting.name())
                .is_some_and(|pool| std::ptr::eq(Arc::as_ptr(pool), rejecting));
            registered.then(|| transactional_locked(&mut state, &service, ""))
        })
    }

    /// Settings for `service`, read from the provider once per default pool
    /// lifetime.
    fn service_config(&self, service: &str) -> PoolConfig {
        if let Some(config) = self.state.lock().services.get(service) {
            return *config;
        }
        let resolved = self.config.pool_config(service).unwrap_or_else(|| {
            let missing = BridgeError::ConfigurationMissing {
                service: service.to_string(),
            };
            tracing::debug!(error = %missing, "using default executor settings");
            PoolConfig::default()
        });
        *self
            .state
            .lock()
            .services
            .entry(service.to_string())
            .or_insert(resolved)
    }
}

fn transactional_locked(state: &mut RegistryState, service: &str, identifier: &str) -> Arc<Pool> {
    let name = ExecutorName::transactional(service, identifier);
    if let Some(pool) = state.pools.get(&name) {
        return Arc::clone(pool);
    }
    let pool = Pool::transactional(name.clone());
    tracing::info!(executor = %name, "transactional executor created");
    state.pools.insert(name, Arc::clone(&pool));
    pool
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::config::StaticPoolConfig;
    use crate::executor::{PoolKind, SubmitOutcome};

    fn registry_with(services: &[(&str, usize)]) -> ExecutorRegistry {
        let provider = services
            .iter()
            .fold(StaticPoolConfig::new(), |provider, (service, max)| {
                provider.with_service(
                    *service,
                    PoolConfig {
                        max_pool_size: *max,
                        keep_alive_secs: 3,
                    },
                )
            });
        ExecutorRegistry::new(Arc::new(provider))
    }

    #[derive(Debug, Default)]
    struct CountingProvider {
        reads: AtomicUsize,
    }

    impl PoolConfigProvider for CountingProvider {
        fn pool_config(&self, _service: &str) -> Option<PoolConfig> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Some(PoolConfig {
                max_pool_size: 2,
                keep_alive_secs: 3,
            })
        }
    }

    #[test]
    fn single_worker_service_gets_transactional_pool() {
        let registry = registry_with(&[("Database", 1)]);
        let pool = registry.get_executor("Database");
        assert_eq!(pool.kind(), PoolKind::Transactional);
        assert_eq!(pool.name().as_str(), "DatabaseTransactionalExecutor");

        let same = registry.get_transactional_executor("Database", None);
        assert!(Arc::ptr_eq(&pool, &same));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unconfigured_service_uses_defaults() {
        let registry = registry_with(&[]);
        let pool = registry.get_executor("Auth");
        assert_eq!(pool.kind(), PoolKind::Transactional);
    }

    #[test]
    fn multi_worker_service_gets_bounded_pool_with_registered_fallback() {
        let registry = registry_with(&[("Storage", 4)]);
        let pool = registry.get_executor("Storage");
        assert_eq!(pool.name().as_str(), "StorageExecutor");
        assert!(matches!(
            pool.kind(),
            PoolKind::Bounded {
                max_pool_size: 4,
                ..
            }
        ));
        assert!(
            registry
                .get(&ExecutorName::transactional("Storage", ""))
                .is_some()
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_lookups_share_one_pool() {
        let registry = Arc::new(registry_with(&[("X", 4)]));
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.get_executor("X")
                })
            })
            .collect();

        let mut pools = Vec::new();
        for handle in handles {
            let Ok(pool) = handle.join() else {
                panic!("lookup thread panicked");
            };
            pools.push(pool);
        }
        let Some(first) = pools.first() else {
            panic!("no pools returned");
        };
        assert!(pools.iter().all(|p| Arc::ptr_eq(first, p)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn configuration_is_read_once_per_service() {
        let provider = Arc::new(CountingProvider::default());
        let registry = ExecutorRegistry::new(Arc::clone(&provider) as Arc<dyn PoolConfigProvider>);
        for _ in 0..5 {
            let _ = registry.get_executor("Functions");
        }
        let _ = registry.get_executor("Messaging");
        assert_eq!(provider.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn configuration_is_reread_after_service_teardown() {
        let provider = Arc::new(CountingProvider::default());
        let registry = ExecutorRegistry::new(Arc::clone(&provider) as Arc<dyn PoolConfigProvider>);
        let _ = registry.get_executor("Functions");
        let _ = registry.get_executor("Functions");
        assert_eq!(registry.shutdown_all("Functions"), 2);
        let _ = registry.get_executor("Functions");
        assert_eq!(provider.reads.load(Ordering::SeqCst), 2);
        registry.shutdown_all("Functions");
    }

    fn hold_worker(pool: &Arc<Pool>, release: &Arc<AtomicBool>) {
        let release = Arc::clone(release);
        let outcome = pool.execute(move || {
            while !release.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
        });
        assert_eq!(outcome, SubmitOutcome::Accepted);
    }

    #[test]
    fn saturated_pool_reroutes_to_recreated_transactional_pool() {
        let registry = registry_with(&[("Storage", 2)]);
        let bounded = registry.get_executor("Storage");
        let original = registry.get_transactional_executor("Storage", None);

        assert!(registry.remove_executor(&ExecutorName::transactional("Storage", "")));
        let recreated = registry.get_transactional_executor("Storage", None);
        assert!(!Arc::ptr_eq(&original, &recreated));

        let release = Arc::new(AtomicBool::new(false));
        hold_worker(&bounded, &release);
        hold_worker(&bounded, &release);

        let (tx, rx) = std::sync::mpsc::channel();
        let outcome = bounded.execute(move || {
            let _ = tx.send(());
        });
        assert_eq!(outcome, SubmitOutcome::RejectedAndRetried);
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());

        release.store(true, Ordering::SeqCst);
        registry.shutdown_all("Storage");
    }

    #[test]
    fn saturated_pool_recreates_missing_transactional_pool() {
        let registry = registry_with(&[("Storage", 2)]);
        let bounded = registry.get_executor("Storage");
        let fallback_name = ExecutorName::transactional("Storage", "");
        assert!(registry.remove_executor(&fallback_name));

        let release = Arc::new(AtomicBool::new(false));
        hold_worker(&bounded, &release);
        hold_worker(&bounded, &release);
        let (tx, rx) = std::sync::mpsc::channel();
        let outcome = bounded.execute(move || {
            let _ = tx.send(());
        });
        assert_eq!(outcome, SubmitOutcome::RejectedAndRetried);
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        assert!(registry.get(&fallback_name).is_some());

        release.store(true, Ordering::SeqCst);
        registry.shutdown_all("Storage");
    }

    #[test]
    fn removed_bounded_pool_runs_no_more_work() {
        let registry = registry_with(&[("Storage", 2)]);
        let bounded = registry.get_executor("Storage");
        assert!(registry.remove_executor(&ExecutorName::bounded("Storage")));

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let outcome = bounded.execute(move || flag.store(true, Ordering::SeqCst));
        assert_eq!(outcome, SubmitOutcome::Dropped);

        let fallback = registry.get_transactional_executor("Storage", None);
        fallback.shutdown_now();
        assert!(fallback.await_termination(Duration::from_secs(2)));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(fallback.stats().completed, 0);
    }

    #[test]
    fn identifiers_isolate_transactional_pools() {
        let registry = registry_with(&[]);
        let a = registry.get_transactional_executor("Database", Some("ref-a"));
        let b = registry.get_transactional_executor("Database", Some("ref-b"));
        let a_again = registry.get_transactional_executor("Database", Some("ref-a"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &a_again));
        assert_eq!(a.name().as_str(), "DatabaseTransactionalExecutorref-a");
    }

    #[test]
    fn remove_executor_shuts_down_and_allows_recreation() {
        let registry = registry_with(&[]);
        let name = ExecutorName::transactional("Database", "stream-1");
        let pool = registry.get_transactional_executor("Database", Some("stream-1"));

        assert!(registry.remove_executor(&name));
        assert!(pool.is_shutdown());
        assert!(registry.get(&name).is_none());
        assert!(!registry.remove_executor(&name));

        let fresh = registry.get_transactional_executor("Database", Some("stream-1"));
        assert!(!Arc::ptr_eq(&pool, &fresh));
        assert!(!fresh.is_shutdown());
    }

    #[test]
    fn shutdown_all_removes_every_service_pool() {
        let registry = registry_with(&[("Storage", 4), ("StorageMetadata", 4)]);
        let pools = [
            registry.get_executor("Storage"),
            registry.get_transactional_executor("Storage", None),
            registry.get_transactional_executor("Storage", Some("upload-7")),
        ];
        let other = registry.get_executor("StorageMetadata");
        assert_eq!(registry.len(), 5);

        assert_eq!(registry.shutdown_all("Storage"), 3);
        assert_eq!(registry.len(), 2);
        for pool in &pools {
            assert!(pool.is_shutdown());
            assert!(registry.get(pool.name()).is_none());
            assert_eq!(pool.execute(|| {}), SubmitOutcome::Dropped);
        }
        assert!(!other.is_shutdown());
        assert!(registry.stats().iter().all(|s| !s.name.belongs_to("Storage")));
    }

    #[test]
    fn stats_are_sorted_by_name() {
        let registry = registry_with(&[("Storage", 2)]);
        let _ = registry.get_executor("Storage");
        let _ = registry.get_transactional_executor("Auth", None);
        let names: Vec<String> = registry
            .stats()
            .into_iter()
            .map(|s| s.name.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "AuthTransactionalExecutor".to_string(),
                "StorageExecutor".to_string(),
                "StorageTransactionalExecutor".to_string(),
            ]
        );
        assert!(!registry.is_empty());
    }
}
