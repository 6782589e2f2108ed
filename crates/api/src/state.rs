use std::sync::Arc;

use dataops_store::SharedStore;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::services::metadata::MetadataClient;
use crate::services::queue::QueueClient;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Key-value/stream store shared by all primitives.
    pub store: SharedStore,
    pub config: Arc<ServerConfig>,
    /// Metadata service client (item lookups).
    pub metadata: Arc<dyn MetadataClient>,
    /// Queue service client (operation submission).
    pub queue: Arc<dyn QueueClient>,
    /// Cancelled when the server shuts down; long-lived responses such as
    /// SSE tails hold child tokens of it.
    pub shutdown: CancellationToken,
}
