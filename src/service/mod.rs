//! Service layer: per-module facades over the shared core.
//!
//! [`TaskService`] binds one feature module's service name to the
//! [`crate::executor::ExecutorRegistry`].

pub mod task_service;

pub use task_service::TaskService;
