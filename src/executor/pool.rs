//! Worker pools backing each named executor.
//!
//! A [`Pool`] is either
//!
//! - **transactional**: one worker draining an unbounded FIFO queue, so
//!   tasks run strictly one at a time in submission order; or
//! - **bounded**: no pre-started workers, at most `max_pool_size` of them,
//!   and a zero-capacity handoff. A task either reaches an idle worker (or a
//!   newly started one) immediately or is rejected; there is no hidden
//!   backlog. Rejected tasks are resubmitted to the pool's [`Fallback`],
//!   resolved at rejection time.
//!
//! A pool that has been shut down drops every submission.
//!
//! Workers are OS threads; the work they run is blocking native SDK calls.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;
use tokio::sync::oneshot;

use super::ExecutorName;
use crate::error::{BridgeError, TaskError, panic_message};

type Job = Box<dyn FnOnce() + Send + 'static>;

type Resolve = dyn Fn(&Pool) -> Option<Arc<Pool>> + Send + Sync;

/// Where a bounded pool sends work it has no worker for.
///
/// The target is looked up on every rejection, so a fallback pool that was
/// removed and recreated is picked up without rebuilding the bounded pool.
#[derive(Clone)]
pub struct Fallback(Arc<Resolve>);

impl Fallback {
    /// Always reroutes to `pool`.
    #[must_use]
    pub fn fixed(pool: Arc<Pool>) -> Self {
        Self(Arc::new(move |_| Some(Arc::clone(&pool))))
    }

    /// Calls `resolve` with the rejecting pool each time work is rejected.
    /// Returning `None` drops the task.
    #[must_use]
    pub fn resolve_with<F>(resolve: F) -> Self
    where
        F: Fn(&Pool) -> Option<Arc<Pool>> + Send + Sync + 'static,
    {
        Self(Arc::new(resolve))
    }

    fn resolve(&self, rejecting: &Pool) -> Option<Arc<Pool>> {
        (self.0)(rejecting)
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback").finish_non_exhaustive()
    }
}

/// Execution policy of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// Exactly one worker, strict FIFO.
    Transactional,
    /// Up to `max_pool_size` workers behind a zero-capacity handoff.
    Bounded {
        /// Maximum number of live workers.
        max_pool_size: usize,
        /// How long an idle worker waits for work before exiting.
        keep_alive: Duration,
    },
}

impl PoolKind {
    const fn keep_alive(&self) -> Option<Duration> {
        match self {
            Self::Transactional => None,
            Self::Bounded { keep_alive, .. } => Some(*keep_alive),
        }
    }

    const fn max_workers(&self) -> usize {
        match self {
            Self::Transactional => 1,
            Self::Bounded { max_pool_size, .. } => *max_pool_size,
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Transactional => "transactional",
            Self::Bounded { .. } => "bounded",
        }
    }
}

/// What happened to a submitted task.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The pool took the task.
    Accepted,
    /// The pool was saturated; the task went to the transactional fallback.
    RejectedAndRetried,
    /// Neither the pool nor a fallback could take the task. It was logged
    /// and discarded.
    Dropped,
}

/// Point-in-time counters for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Registry name.
    pub name: ExecutorName,
    /// `"transactional"` or `"bounded"`.
    pub kind: &'static str,
    /// Maximum number of workers.
    pub max_pool_size: usize,
    /// Idle worker timeout in seconds; `None` for transactional pools.
    pub keep_alive_secs: Option<u64>,
    /// Live worker threads.
    pub workers: usize,
    /// Workers currently running a task.
    pub active: usize,
    /// Tasks waiting in the queue.
    pub queued: usize,
    /// Tasks that finished, including ones that panicked.
    pub completed: u64,
    /// Submissions this pool rejected.
    pub rejected: u64,
    /// Rejections recovered by the transactional fallback.
    pub rerouted: u64,
    /// Rejections that were dropped.
    pub dropped: u64,
    /// Whether the pool has been shut down.
    pub shutdown: bool,
}

struct PoolState {
    queue: VecDeque<Job>,
    workers: usize,
    /// Workers not running a task. Includes workers that were spawned but
    /// have not picked up their first task yet.
    idle: usize,
    spawned: u64,
    shutdown: bool,
}

impl fmt::Debug for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolState")
            .field("queued", &self.queue.len())
            .field("workers", &self.workers)
            .field("idle", &self.idle)
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

/// A named worker pool.
#[derive(Debug)]
pub struct Pool {
    name: ExecutorName,
    kind: PoolKind,
    state: Mutex<PoolState>,
    work_ready: Condvar,
    terminated: Condvar,
    fallback: Option<Fallback>,
    completed: AtomicU64,
    rejected: AtomicU64,
    rerouted: AtomicU64,
    dropped: AtomicU64,
    peak_workers: AtomicUsize,
}

impl Pool {
    /// Creates a single-worker pool.
    #[must_use]
    pub fn transactional(name: ExecutorName) -> Arc<Self> {
        Arc::new(Self::with_kind(name, PoolKind::Transactional, None))
    }

    /// Creates a bounded pool that reroutes rejected work to `fallback`.
    ///
    /// A `max_pool_size` of zero is raised to one.
    #[must_use]
    pub fn bounded(
        name: ExecutorName,
        max_pool_size: usize,
        keep_alive: Duration,
        fallback: Option<Fallback>,
    ) -> Arc<Self> {
        let kind = PoolKind::Bounded {
            max_pool_size: max_pool_size.max(1),
            keep_alive,
        };
        Arc::new(Self::with_kind(name, kind, fallback))
    }

    fn with_kind(name: ExecutorName, kind: PoolKind, fallback: Option<Fallback>) -> Self {
        Self {
            name,
            kind,
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                workers: 0,
                idle: 0,
                spawned: 0,
                shutdown: false,
            }),
            work_ready: Condvar::new(),
            terminated: Condvar::new(),
            fallback,
            completed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            rerouted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            peak_workers: AtomicUsize::new(0),
        }
    }

    /// Registry name of this pool.
    #[must_use]
    pub const fn name(&self) -> &ExecutorName {
        &self.name
    }

    /// Execution policy of this pool.
    #[must_use]
    pub const fn kind(&self) -> PoolKind {
        self.kind
    }

    /// Runs `task` on this pool, rerouting to the fallback on saturation.
    ///
    /// Once the pool is shut down every task is dropped, even if the
    /// fallback is still alive.
    pub fn execute<F>(self: &Arc<Self>, task: F) -> SubmitOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        match self.try_submit(Box::new(task)) {
            Ok(()) => SubmitOutcome::Accepted,
            Err(job) if self.is_shutdown() => {
                drop(job);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(executor = %self.name, "executor shut down; task dropped");
                SubmitOutcome::Dropped
            }
            Err(job) => self.reject(job),
        }
    }

    /// Runs `task` on this pool and returns a handle to its result.
    pub fn call<T, F>(self: &Arc<Self>, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let outcome = self.execute(move || {
            let result = catch_unwind(AssertUnwindSafe(task))
                .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
            let _ = tx.send(result);
        });
        TaskHandle {
            rx,
            outcome,
            executor: self.name.clone(),
        }
    }

    /// Stops accepting work, discards queued tasks and wakes idle workers.
    ///
    /// Returns the number of discarded tasks. A task already running is not
    /// interrupted; its worker exits when it returns.
    pub fn shutdown_now(&self) -> usize {
        let discarded = {
            let mut state = self.state.lock();
            state.shutdown = true;
            if state.workers == 0 {
                self.terminated.notify_all();
            }
            std::mem::take(&mut state.queue)
        };
        self.work_ready.notify_all();
        let count = discarded.len();
        // Dropping queued closures cancels their task handles.
        drop(discarded);
        tracing::info!(executor = %self.name, discarded = count, "executor shut down");
        count
    }

    /// Returns `true` once [`Pool::shutdown_now`] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Returns `true` once the pool is shut down and every worker exited.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        let state = self.state.lock();
        state.shutdown && state.workers == 0
    }

    /// Blocks until the pool terminates or `timeout` elapses. Returns
    /// whether it terminated.
    ///
    /// Must not be called from one of this pool's own workers.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !(state.shutdown && state.workers == 0) {
            if self.terminated.wait_until(&mut state, deadline).timed_out() {
                return state.shutdown && state.workers == 0;
            }
        }
        true
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            name: self.name.clone(),
            kind: self.kind.label(),
            max_pool_size: self.kind.max_workers(),
            keep_alive_secs: self.kind.keep_alive().map(|d| d.as_secs()),
            workers: state.workers,
            active: state.workers.saturating_sub(state.idle),
            queued: state.queue.len(),
            completed: self.completed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            rerouted: self.rerouted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            shutdown: state.shutdown,
        }
    }

    /// Highest number of simultaneously live workers seen.
    #[must_use]
    pub fn peak_workers(&self) -> usize {
        self.peak_workers.load(Ordering::Relaxed)
    }

    /// Hands `job` to a worker, or gives it back if the pool cannot take it.
    fn try_submit(self: &Arc<Self>, job: Job) -> Result<(), Job> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Err(job);
        }
        match self.kind {
            PoolKind::Transactional => {
                if state.workers == 0 {
                    return self.spawn_worker(&mut state, job);
                }
                state.queue.push_back(job);
                self.work_ready.notify_one();
                Ok(())
            }
            PoolKind::Bounded { max_pool_size, .. } => {
                // Every queued job must have an idle worker waiting for it.
                if state.queue.len() < state.idle {
                    state.queue.push_back(job);
                    self.work_ready.notify_one();
                    Ok(())
                } else if state.workers < max_pool_size {
                    self.spawn_worker(&mut state, job)
                } else {
                    Err(job)
                }
            }
        }
    }

    /// Starts a worker whose first task is `job`.
    fn spawn_worker(
        self: &Arc<Self>,
        state: &mut MutexGuard<'_, PoolState>,
        job: Job,
    ) -> Result<(), Job> {
        state.queue.push_back(job);
        state.workers += 1;
        state.idle += 1;
        state.spawned += 1;
        let thread_name = format!("{}-{}", self.name, state.spawned);
        let pool = Arc::clone(self);
        match std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || pool.work())
        {
            Ok(_) => {
                self.peak_workers.fetch_max(state.workers, Ordering::Relaxed);
                tracing::trace!(executor = %self.name, thread = %thread_name, "worker started");
                Ok(())
            }
            Err(e) => {
                state.workers -= 1;
                state.idle -= 1;
                let err = BridgeError::ThreadSpawn {
                    name: thread_name,
                    reason: e.to_string(),
                };
                tracing::error!(executor = %self.name, error = %err, "could not start worker");
                match state.queue.pop_back() {
                    Some(job) => Err(job),
                    None => Ok(()),
                }
            }
        }
    }

    /// Worker loop. Runs until shutdown, or until idle past keep-alive.
    fn work(self: Arc<Self>) {
        let keep_alive = self.kind.keep_alive();
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.queue.pop_front() {
                state.idle -= 1;
                MutexGuard::unlocked(&mut state, || self.run(job));
                state.idle += 1;
                continue;
            }
            if state.shutdown {
                break;
            }
            let timed_out = match keep_alive {
                Some(timeout) => self.work_ready.wait_for(&mut state, timeout).timed_out(),
                None => {
                    self.work_ready.wait(&mut state);
                    false
                }
            };
            if timed_out && state.queue.is_empty() {
                break;
            }
        }
        state.idle -= 1;
        state.workers -= 1;
        if state.workers == 0 {
            self.terminated.notify_all();
        }
        tracing::trace!(executor = %self.name, remaining = state.workers, "worker exited");
    }

    fn run(&self, job: Job) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
            tracing::error!(
                executor = %self.name,
                panic = %panic_message(payload.as_ref()),
                "task panicked"
            );
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn reject(&self, job: Job) -> SubmitOutcome {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        let err = BridgeError::ExecutorRejected {
            executor: self.name.to_string(),
        };
        let fallback = self
            .fallback
            .as_ref()
            .and_then(|f| f.resolve(self))
            .filter(|f| !f.is_shutdown());
        if let Some(fallback) = fallback {
            match fallback.try_submit(job) {
                Ok(()) => {
                    self.rerouted.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(error = %err, fallback = %fallback.name, "task rerouted");
                    return SubmitOutcome::RejectedAndRetried;
                }
                // Fallback shut down between the check and the submit.
                Err(job) => drop(job),
            }
        }
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(error = %err, "no live fallback executor; task dropped");
        SubmitOutcome::Dropped
    }
}

/// Future resolving to the result of a task submitted with [`Pool::call`].
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, TaskError>>,
    outcome: SubmitOutcome,
    executor: ExecutorName,
}

impl<T> TaskHandle<T> {
    /// How the pool treated the submission.
    pub const fn outcome(&self) -> SubmitOutcome {
        self.outcome
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("executor", &self.executor)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(match self.outcome {
                SubmitOutcome::Dropped => TaskError::Rejected(self.executor.to_string()),
                SubmitOutcome::Accepted | SubmitOutcome::RejectedAndRetried => {
                    TaskError::Cancelled
                }
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
