//! # bridge-core
//!
//! Thread-safety core for native SDK bridge modules.
//!
//! Native callbacks fire on arbitrary threads; scripting runtimes accept
//! events on one thread and may not be listening yet. This crate provides
//! an ordered, loss-free event emitter between the two, plus a registry of
//! named executor pools so each feature module gets its own concurrency
//! domain.
//!
//! ## Architecture
//!
//! ```text
//! Native callbacks (any thread)       Diagnostics clients (HTTP)
//!     │                                   │
//!     ├── EventEmitter (emitter/)         ├── REST Handlers (api/)
//!     │     └── coordinator thread        │
//!     │           ├── ListenerRegistry    └── AppState (app_state)
//!     │           ├── PendingQueue (domain/)
//!     │           └── EventConsumer ──► runtime
//!     │
//!     ├── TaskService (service/)
//!     └── ExecutorRegistry (executor/)
//!           └── Pool: bounded | transactional
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod emitter;
pub mod error;
pub mod executor;
pub mod service;
