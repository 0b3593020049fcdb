//! Executor pools for bridge module work.
//!
//! Each service owns up to three kinds of pool, all stored in the
//! [`ExecutorRegistry`]:
//!
//! - `<service>Executor`: bounded pool, zero-capacity handoff, idle
//!   workers exit after the keep-alive.
//! - `<service>TransactionalExecutor`: one worker, unbounded FIFO queue.
//!   Also the fallback for work the bounded pool rejects.
//! - `<service>TransactionalExecutor<id>`: isolated single-worker pools
//!   for independent sessions.

mod name;
mod pool;
mod registry;

pub use name::ExecutorName;
pub use pool::{Fallback, Pool, PoolKind, PoolStats, SubmitOutcome, TaskHandle};
pub use registry::ExecutorRegistry;
