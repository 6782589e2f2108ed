//! Domain model for the dataops coordination layer.
//!
//! Pure types and rules shared by the store repositories and the HTTP
//! layer: the error taxonomy, the reader/writer lock counter pair, job
//! records, and status stream events. Nothing in this crate performs I/O.

pub mod error;
pub mod job;
pub mod lock;
pub mod resource;
pub mod stream;
