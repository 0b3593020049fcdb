//! Executor DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::executor::PoolStats;

/// Counters of one executor pool.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExecutorStatsDto {
    /// Registry name, e.g. `StorageExecutor`.
    pub name: String,
    /// `transactional` or `bounded`.
    pub kind: String,
    /// Worker ceiling.
    pub max_pool_size: usize,
    /// Idle worker lifetime; absent for transactional pools.
    pub keep_alive_secs: Option<u64>,
    /// Live workers.
    pub workers: usize,
    /// Workers currently running a task.
    pub active: usize,
    /// Tasks waiting for a worker.
    pub queued: usize,
    /// Tasks run to completion.
    pub completed: u64,
    /// Submissions this pool refused.
    pub rejected: u64,
    /// Refused submissions handed to the fallback pool.
    pub rerouted: u64,
    /// Refused submissions that could not be rerouted.
    pub dropped: u64,
    /// Whether the pool has been shut down.
    pub shutdown: bool,
}

impl From<PoolStats> for ExecutorStatsDto {
    fn from(s: PoolStats) -> Self {
        Self {
            name: s.name.to_string(),
            kind: s.kind.to_string(),
            max_pool_size: s.max_pool_size,
            keep_alive_secs: s.keep_alive_secs,
            workers: s.workers,
            active: s.active,
            queued: s.queued,
            completed: s.completed,
            rejected: s.rejected,
            rerouted: s.rerouted,
            dropped: s.dropped,
            shutdown: s.shutdown,
        }
    }
}

/// Response body for `GET /executors`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExecutorListResponse {
    /// Registered pools ordered by name.
    pub data: Vec<ExecutorStatsDto>,
    /// Number of registered pools.
    pub total: usize,
}
