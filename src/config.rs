//! Bridge configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable                                  | Default          |
//! |-------------------------------------------|------------------|
//! | `LISTEN_ADDR`                             | `127.0.0.1:3100` |
//! | `EVENT_QUEUE_CAPACITY` (`0` = unbounded)  | `10000`          |
//! | `TASK_EXECUTOR_MAX_POOL_SIZE`             | `1`              |
//! | `TASK_EXECUTOR_KEEP_ALIVE_SECS`           | `3`              |
//! | `TASK_EXECUTOR_<SERVICE>_MAX_POOL_SIZE`   | global value     |
//! | `TASK_EXECUTOR_<SERVICE>_KEEP_ALIVE_SECS` | global value     |

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Serialize;

use crate::error::BridgeError;

const EXECUTOR_PREFIX: &str = "TASK_EXECUTOR_";
const MAX_POOL_SIZE: &str = "MAX_POOL_SIZE";
const KEEP_ALIVE_SECS: &str = "KEEP_ALIVE_SECS";

/// Default pending-queue depth.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 10_000;

/// Worker pool settings for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolConfig {
    /// Maximum concurrent workers. `<= 1` selects a transactional pool.
    pub max_pool_size: usize,
    /// Seconds an idle bounded-pool worker lives before exiting.
    pub keep_alive_secs: u64,
}

impl PoolConfig {
    /// Idle worker timeout as a [`Duration`].
    #[must_use]
    pub const fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Returns `true` if this service should run on a single worker.
    #[must_use]
    pub const fn is_transactional(&self) -> bool {
        self.max_pool_size <= 1
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_pool_size: 1,
            keep_alive_secs: 3,
        }
    }
}

/// Source of per-service pool settings.
///
/// Read once per service, the first time one of its pools is created.
pub trait PoolConfigProvider: Send + Sync + fmt::Debug {
    /// Settings for `service`, or `None` to fall back to defaults.
    fn pool_config(&self, service: &str) -> Option<PoolConfig>;
}

/// In-memory provider, mostly for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPoolConfig {
    services: HashMap<String, PoolConfig>,
}

impl StaticPoolConfig {
    /// Creates an empty provider; every service gets defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration for `service`.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>, config: PoolConfig) -> Self {
        self.services.insert(service.into(), config);
        self
    }
}

impl PoolConfigProvider for StaticPoolConfig {
    fn pool_config(&self, service: &str) -> Option<PoolConfig> {
        self.services.get(service).copied()
    }
}

/// Provider backed by `TASK_EXECUTOR_*` environment variables.
///
/// Values are captured at construction; service-specific variables
/// override the global ones field by field.
#[derive(Debug, Clone, Default)]
pub struct EnvPoolConfig {
    vars: HashMap<String, String>,
}

impl EnvPoolConfig {
    /// Captures the `TASK_EXECUTOR_*` variables of the current process.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Builds a provider from explicit key/value pairs.
    #[must_use]
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(EXECUTOR_PREFIX))
            .collect();
        Self { vars }
    }

    fn lookup<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.vars.get(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable executor setting");
                None
            }
        }
    }
}

fn global_key(field: &str) -> String {
    format!("{EXECUTOR_PREFIX}{field}")
}

fn service_key(service: &str, field: &str) -> String {
    format!("{EXECUTOR_PREFIX}{}_{field}", service.to_uppercase())
}

impl PoolConfigProvider for EnvPoolConfig {
    fn pool_config(&self, service: &str) -> Option<PoolConfig> {
        let max_pool_size = self
            .lookup(&service_key(service, MAX_POOL_SIZE))
            .or_else(|| self.lookup(&global_key(MAX_POOL_SIZE)));
        let keep_alive_secs = self
            .lookup(&service_key(service, KEEP_ALIVE_SECS))
            .or_else(|| self.lookup(&global_key(KEEP_ALIVE_SECS)));

        if max_pool_size.is_none() && keep_alive_secs.is_none() {
            return None;
        }
        let defaults = PoolConfig::default();
        Some(PoolConfig {
            max_pool_size: max_pool_size.unwrap_or(defaults.max_pool_size),
            keep_alive_secs: keep_alive_secs.unwrap_or(defaults.keep_alive_secs),
        })
    }
}

/// Top-level bridge configuration.
///
/// Loaded once at startup via [`BridgeConfig::from_env`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Socket address for the diagnostics HTTP server.
    pub listen_addr: SocketAddr,

    /// Pending-queue depth limit; `0` leaves it unbounded.
    pub event_queue_capacity: usize,

    /// Per-service executor settings.
    pub executors: EnvPoolConfig,
}

impl BridgeConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if `LISTEN_ADDR` is set but cannot
    /// be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, BridgeError> {
        dotenvy::dotenv().ok();

        let raw_addr =
            std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".to_string());
        let listen_addr: SocketAddr = raw_addr
            .parse()
            .map_err(|e| BridgeError::Config(format!("LISTEN_ADDR={raw_addr}: {e}")))?;

        let event_queue_capacity = parse_env("EVENT_QUEUE_CAPACITY", DEFAULT_EVENT_QUEUE_CAPACITY);

        Ok(Self {
            listen_addr,
            event_queue_capacity,
            executors: EnvPoolConfig::from_env(),
        })
    }

    /// Queue capacity in the form [`crate::emitter::EventEmitter::spawn`]
    /// takes.
    #[must_use]
    pub const fn queue_capacity(&self) -> Option<usize> {
        if self.event_queue_capacity == 0 {
            None
        } else {
            Some(self.event_queue_capacity)
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
