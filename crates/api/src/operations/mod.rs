//! Long-running resource operations submitted on behalf of users.

pub mod dispatcher;

pub use dispatcher::{OperationRequest, ResourceOperationDispatcher};
