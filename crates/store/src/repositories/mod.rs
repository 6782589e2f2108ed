//! Repository layer for the store.
//!
//! Each repository is a zero-sized struct with async methods that accept
//! the shared store adapter.

pub mod job_repo;
pub mod lock_repo;
pub mod stream_repo;

pub use job_repo::JobRepo;
pub use lock_repo::ResourceLockRepo;
pub use stream_repo::{StatusStreamRepo, TailOptions};
