//! Request handlers.
//!
//! Each submodule provides the async handler functions for one route group.
//! Handlers delegate to the repositories in `dataops_store` (or to the
//! operation dispatcher) and map errors via [`AppError`](crate::error::AppError).

pub mod resource_lock;
pub mod resource_operations;
pub mod task_stream;
pub mod tasks;
