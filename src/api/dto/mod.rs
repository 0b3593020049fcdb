//! Data Transfer Objects for the diagnostics endpoints.
//!
//! Domain types stay free of OpenAPI derives; handlers convert into these.

pub mod event_dto;
pub mod executor_dto;

pub use event_dto::*;
pub use executor_dto::*;
